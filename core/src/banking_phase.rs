//! Banking products: accounts, account relationships, transactions.
//!
//! RULE: `balance_after` is a left fold over one account's transactions
//! in timestamp order. Accounts never share a running balance.

use crate::{
    config::{BankingConfig, GenConfig},
    distribution::{offset_after, participants, repeaters, round2},
    error::{GenError, GenResult},
    name_generator::NameGenerator,
    phase::{pool, pool_ids, Phase, PhaseContext, PhaseOutput},
    registry::{tags, TagFilter, CUSTOMER, ROLE, STATUS, TYPE},
    rng::PhaseSlot,
    types::{EntityId, EntityKind},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountRecord {
    pub account_id: EntityId,
    pub account_number: String,
    pub customer_id: EntityId,
    pub account_type: String,
    /// Final folded balance.
    pub balance: f64,
    pub currency: String,
    pub status: String,
    pub opened_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountRelationshipRecord {
    pub account_id: EntityId,
    pub related_account_id: EntityId,
    pub relationship_type: String,
    pub established_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub account_id: EntityId,
    pub transaction_type: String,
    pub amount: f64,
    pub balance_after: f64,
    pub counterparty_account_id: Option<EntityId>,
    pub processed_by: Option<EntityId>,
    pub description: String,
    pub transaction_at: NaiveDateTime,
}

#[derive(Debug, Default)]
pub struct Banking {
    pub accounts: Vec<AccountRecord>,
    pub relationships: Vec<AccountRelationshipRecord>,
    pub transactions: Vec<TransactionRecord>,
}

/// A drawn movement before it is applied to the balance.
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    pub kind: String,
    pub amount: f64,
}

pub fn is_credit(kind: &str) -> bool {
    kind == "deposit"
}

/// Apply `movements` in order to `opening`. A debit larger than the
/// balance is capped at the balance; a debit against an empty account
/// is booked as a deposit of the drawn amount instead.
/// Returns `(kind, amount, balance_after)` per movement.
pub fn fold_balance(opening: f64, movements: &[Movement]) -> Vec<(String, f64, f64)> {
    let mut balance = round2(opening);
    movements
        .iter()
        .map(|m| {
            let amount = round2(m.amount);
            if is_credit(&m.kind) {
                balance = round2(balance + amount);
                (m.kind.clone(), amount, balance)
            } else if balance >= 0.01 {
                let debit = amount.min(balance);
                balance = round2(balance - debit);
                (m.kind.clone(), debit, balance)
            } else {
                balance = round2(balance + amount);
                ("deposit".to_string(), amount, balance)
            }
        })
        .collect()
}

fn describe(kind: &str, rng: &mut crate::rng::GenRng) -> String {
    let options: &[&str] = match kind {
        "deposit" => &["Cash deposit", "Payroll deposit", "Mobile check deposit", "Incoming wire"],
        "withdrawal" => &["ATM withdrawal", "Branch withdrawal", "Cash back"],
        "payment" => &["Card payment", "Utility bill payment", "Online purchase", "Loan payment"],
        "transfer" => &["Transfer to account", "Scheduled transfer", "Internal transfer"],
        "fee" => &["Monthly maintenance fee", "Overdraft fee", "Wire fee"],
        _ => &["Account activity"],
    };
    rng.pick(options).to_string()
}

pub struct BankingPhase;

impl BankingPhase {
    pub fn build(&self, ctx: &mut PhaseContext<'_>) -> GenResult<Banking> {
        let config: &GenConfig = ctx.config;
        let cfg = &config.banking;
        let now = ctx.now;

        let customers = pool(&ctx.registry, EntityKind::Customer, &TagFilter::any());
        let holders = participants(&customers, cfg.participation, &mut ctx.rng)?;
        let second = repeaters(&holders, cfg.second_account_ratio, &mut ctx.rng)?;

        let mut banking = Banking::default();
        // (customer, index of first account) for relationship building.
        let mut first_account = HashMap::new();
        for (customer_id, since) in holders.iter().chain(second.iter()) {
            let since = since.ok_or_else(|| {
                GenError::Config(format!("customer '{customer_id}' has no creation date"))
            })?;
            let account = self.open_account(ctx, cfg, customer_id, since, now)?;
            match first_account.get(customer_id) {
                None => {
                    first_account.insert(customer_id.clone(), banking.accounts.len());
                }
                Some(&first) => {
                    let primary: &AccountRecord = &banking.accounts[first];
                    banking.relationships.push(AccountRelationshipRecord {
                        account_id: account.account_id.clone(),
                        related_account_id: primary.account_id.clone(),
                        relationship_type: cfg.relationship_types.sample(&mut ctx.rng),
                        established_at: account.created_at.max(primary.created_at),
                    });
                }
            }
            banking.accounts.push(account);
        }

        self.transactions(ctx, cfg, &mut banking)?;

        for a in &banking.accounts {
            ctx.registry.register_at(
                EntityKind::Account,
                a.account_id.clone(),
                tags([
                    (CUSTOMER, a.customer_id.as_str()),
                    (TYPE, a.account_type.as_str()),
                    (STATUS, a.status.as_str()),
                ]),
                a.created_at,
            )?;
        }
        log::debug!(
            "banking: {} accounts for {} customers, {} transactions",
            banking.accounts.len(),
            holders.len(),
            banking.transactions.len()
        );
        Ok(banking)
    }

    fn open_account(
        &self,
        ctx: &mut PhaseContext<'_>,
        cfg: &BankingConfig,
        customer_id: &str,
        customer_since: NaiveDateTime,
        now: NaiveDateTime,
    ) -> GenResult<AccountRecord> {
        let account_type = cfg.account_types.sample(&mut ctx.rng);
        let opening = cfg
            .opening_balances
            .get(&account_type)
            .ok_or_else(|| GenError::Config(format!("no opening balance for '{account_type}'")))?
            .uniform(&mut ctx.rng);
        let created_at = offset_after(customer_since, 0, cfg.open_window_days, now, &mut ctx.rng);
        let currency = if ctx.rng.chance(cfg.home_currency_ratio) {
            cfg.home_currency.clone()
        } else {
            ctx.rng.pick(&cfg.foreign_currencies).clone()
        };
        Ok(AccountRecord {
            account_id: ctx.new_id(EntityKind::Account)?,
            account_number: ctx.unique("account_number", |rng| NameGenerator::digits(rng, 10))?,
            customer_id: customer_id.to_string(),
            status: cfg.statuses.sample(&mut ctx.rng),
            balance: round2(opening),
            currency,
            opened_date: created_at.date(),
            created_at,
            account_type,
        })
    }

    /// Transactions for every account, in (opened, now]. Each account's
    /// stored balance becomes the last `balance_after`.
    fn transactions(&self, ctx: &mut PhaseContext<'_>, cfg: &BankingConfig, banking: &mut Banking) -> GenResult<()> {
        let now = ctx.now;
        let tellers = pool_ids(
            &ctx.registry,
            EntityKind::Employee,
            &TagFilter::any().with(ROLE, "customer_service_rep").with(STATUS, "active"),
        );
        let account_ids: Vec<EntityId> = banking.accounts.iter().map(|a| a.account_id.clone()).collect();

        for (idx, account) in banking.accounts.iter_mut().enumerate() {
            let span = (now - account.created_at).num_seconds();
            if span <= 0 {
                continue;
            }
            let k = ctx.rng.range_i64(cfg.min_transactions as i64, cfg.max_transactions as i64) as usize;
            // Strictly increasing, all after the opening moment.
            let offsets = ctx.rng.sorted_distinct_below(span as u64, k);

            let movements: Vec<Movement> = offsets
                .iter()
                .map(|_| {
                    let kind = cfg.transaction_types.sample(&mut ctx.rng);
                    let amount = cfg.transaction_amounts.get(&kind).map_or(0.0, |r| r.uniform(&mut ctx.rng));
                    Movement { kind, amount }
                })
                .collect();

            let folded = fold_balance(account.balance, &movements);
            for (offset, (kind, amount, balance_after)) in offsets.into_iter().zip(folded) {
                let counterparty_account_id = if kind == "transfer" && account_ids.len() > 1 {
                    // Any other account of the bank.
                    let mut other = ctx.rng.next_u64_below(account_ids.len() as u64 - 1) as usize;
                    if other >= idx {
                        other += 1;
                    }
                    Some(account_ids[other].clone())
                } else {
                    None
                };
                let processed_by = if !tellers.is_empty() && ctx.rng.chance(cfg.processed_by_ratio) {
                    Some(ctx.rng.pick(&tellers).clone())
                } else {
                    None
                };
                banking.transactions.push(TransactionRecord {
                    transaction_id: ctx.new_code("TXN", "transaction_id")?,
                    account_id: account.account_id.clone(),
                    description: describe(&kind, &mut ctx.rng),
                    transaction_type: kind,
                    amount,
                    balance_after,
                    counterparty_account_id,
                    processed_by,
                    transaction_at: account.created_at + Duration::seconds(offset as i64 + 1),
                });
                account.balance = balance_after;
            }
        }
        Ok(())
    }
}

impl Phase for BankingPhase {
    fn name(&self) -> &'static str {
        "banking"
    }

    fn slot(&self) -> PhaseSlot {
        PhaseSlot::Banking
    }

    fn reads(&self) -> &'static [EntityKind] {
        &[EntityKind::Customer, EntityKind::Employee]
    }

    fn produces(&self) -> &'static [EntityKind] {
        &[EntityKind::Account]
    }

    fn generate(&self, ctx: &mut PhaseContext<'_>) -> GenResult<PhaseOutput> {
        let banking = self.build(ctx)?;
        let mut out = PhaseOutput::new();
        out.push(&banking.accounts);
        out.push(&banking.relationships);
        out.push(&banking.transactions);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        customer_phase::CustomerMasterPhase, phase::testing, registry::IdentifierRegistry,
        unique::UniquenessLedger, workforce_phase::WorkforcePhase,
    };
    use std::collections::BTreeMap;

    fn movement(kind: &str, amount: f64) -> Movement {
        Movement { kind: kind.into(), amount }
    }

    #[test]
    fn fold_never_overdraws() {
        let folded = fold_balance(
            100.0,
            &[
                movement("withdrawal", 30.0),
                movement("payment", 500.0),
                movement("fee", 5.0),
                movement("deposit", 40.0),
            ],
        );
        let balances: Vec<f64> = folded.iter().map(|(_, _, b)| *b).collect();
        assert_eq!(balances, vec![70.0, 0.0, 5.0, 45.0]);
        assert_eq!(folded[1].1, 70.0, "debit capped at the balance");
        assert_eq!(folded[2].0, "deposit", "debit on an empty account is booked as a deposit");
    }

    #[test]
    fn running_balance_is_a_per_account_fold() {
        let config = GenConfig::default_test();
        let mut registry = IdentifierRegistry::new();
        let mut ledger = UniquenessLedger::default();
        testing::run(&config, &mut registry, &mut ledger, PhaseSlot::Workforce, |ctx| WorkforcePhase.build(ctx));
        testing::run(&config, &mut registry, &mut ledger, PhaseSlot::CustomerMaster, |ctx| {
            CustomerMasterPhase.build(ctx)
        });
        let banking = testing::run(&config, &mut registry, &mut ledger, PhaseSlot::Banking, |ctx| {
            BankingPhase.build(ctx)
        });

        // 60 customers: 45 hold an account, 11 of those hold a second one.
        assert_eq!(banking.accounts.len(), 45 + 11);
        assert_eq!(banking.relationships.len(), 11);

        let mut per_account: BTreeMap<&str, Vec<&TransactionRecord>> = BTreeMap::new();
        for t in &banking.transactions {
            per_account.entry(t.account_id.as_str()).or_default().push(t);
        }
        let accounts: HashMap<&str, &AccountRecord> =
            banking.accounts.iter().map(|a| (a.account_id.as_str(), a)).collect();
        for (account_id, txns) in per_account {
            let account = accounts[account_id];
            assert!(txns.windows(2).all(|w| w[0].transaction_at < w[1].transaction_at));
            assert!(txns.iter().all(|t| t.transaction_at > account.created_at && t.transaction_at <= testing::now()));
            assert!(txns.iter().all(|t| t.balance_after >= 0.0));
            for w in txns.windows(2) {
                let delta = if is_credit(&w[1].transaction_type) { w[1].amount } else { -w[1].amount };
                assert!((w[0].balance_after + delta - w[1].balance_after).abs() < 0.011);
            }
            assert_eq!(account.balance, txns[txns.len() - 1].balance_after);
            for t in txns {
                if let Some(other) = &t.counterparty_account_id {
                    assert_ne!(other, account_id);
                    assert!(accounts.contains_key(other.as_str()));
                }
            }
        }
    }
}
