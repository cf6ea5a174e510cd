//! Workforce: departments, employees and training programs.
//!
//! Reads nothing. Every later phase that needs a loan officer, agent or
//! compliance officer finds one here through the `role` tag.

use crate::{
    config::{entity, GenConfig},
    distribution::{between, participants, round2, start_of_day, within_last_days},
    error::GenResult,
    name_generator::NameGenerator,
    phase::{take_fixed, Phase, PhaseContext, PhaseOutput},
    registry::{tags, DEPARTMENT, ROLE, STATUS},
    rng::PhaseSlot,
    types::{EntityId, EntityKind},
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentRecord {
    pub department_id: EntityId,
    pub code: String,
    pub department_name: String,
    pub department_head_id: Option<EntityId>,
    pub budget: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeRecord {
    pub employee_id: EntityId,
    pub employee_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub department_id: Option<EntityId>,
    pub branch_code: String,
    pub manager_id: Option<EntityId>,
    pub hire_date: NaiveDate,
    pub termination_date: Option<NaiveDate>,
    pub employment_status: String, // active | terminated
    pub salary: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingProgramRecord {
    pub program_id: EntityId,
    pub program_name: String,
    pub category: String,
    pub duration_hours: i64,
    pub offers_certification: bool,
}

/// One attempt's workforce, before it is flattened into table batches.
#[derive(Debug, Default)]
pub struct Workforce {
    pub departments: Vec<DepartmentRecord>,
    pub employees: Vec<EmployeeRecord>,
    pub programs: Vec<TrainingProgramRecord>,
}

pub struct WorkforcePhase;

impl WorkforcePhase {
    pub fn build(&self, ctx: &mut PhaseContext<'_>) -> GenResult<Workforce> {
        let config: &GenConfig = ctx.config;
        let mut departments = self.departments(ctx, config)?;
        let employees = self.employees(ctx, config, &departments)?;
        assign_heads(ctx, &mut departments, &employees);
        let programs = self.programs(ctx, config)?;

        for d in &departments {
            ctx.registry
                .register(EntityKind::Department, d.department_id.clone(), tags([(DEPARTMENT, d.code.as_str())]))?;
        }
        let codes: BTreeMap<&str, &str> = departments
            .iter()
            .map(|d| (d.department_id.as_str(), d.code.as_str()))
            .collect();
        for e in &employees {
            let department = e
                .department_id
                .as_deref()
                .and_then(|id| codes.get(id).copied())
                .unwrap_or("none");
            ctx.registry.register_at(
                EntityKind::Employee,
                e.employee_id.clone(),
                tags([
                    (ROLE, e.role.as_str()),
                    (STATUS, e.employment_status.as_str()),
                    (DEPARTMENT, department),
                ]),
                start_of_day(e.hire_date),
            )?;
        }
        for p in &programs {
            ctx.registry
                .register(EntityKind::TrainingProgram, p.program_id.clone(), tags([]))?;
        }

        log::debug!(
            "workforce: {} departments, {} employees, {} programs",
            departments.len(),
            employees.len(),
            programs.len()
        );
        Ok(Workforce { departments, employees, programs })
    }

    fn departments(&self, ctx: &mut PhaseContext<'_>, config: &GenConfig) -> GenResult<Vec<DepartmentRecord>> {
        let n = ctx.count(entity::DEPARTMENTS)?;
        let specs = take_fixed(entity::DEPARTMENTS, &config.workforce.departments, n)?;
        let mut out = Vec::with_capacity(n);
        for spec in specs {
            out.push(DepartmentRecord {
                department_id: ctx.new_id(EntityKind::Department)?,
                code: spec.code.clone(),
                department_name: spec.name.clone(),
                department_head_id: None,
                budget: round2(config.workforce.department_budget.uniform(&mut ctx.rng)),
            });
        }
        Ok(out)
    }

    fn employees(
        &self,
        ctx: &mut PhaseContext<'_>,
        config: &GenConfig,
        departments: &[DepartmentRecord],
    ) -> GenResult<Vec<EmployeeRecord>> {
        let cfg = &config.workforce;
        let n = ctx.count(entity::EMPLOYEES)?;
        let branches = ctx.count(entity::BRANCHES)?.max(1) as i64;
        let now = ctx.now;

        let department_by_code: BTreeMap<&str, &str> = departments
            .iter()
            .map(|d| (d.code.as_str(), d.department_id.as_str()))
            .collect();

        // Exact counts so a 15-person workforce still staffs every major role.
        let roles = cfg.roles.apportion(n, &mut ctx.rng);
        let indices: Vec<usize> = (0..n).collect();
        let terminated: HashSet<usize> = participants(&indices, cfg.terminated_ratio, &mut ctx.rng)?
            .into_iter()
            .collect();

        let mut out: Vec<EmployeeRecord> = Vec::with_capacity(n);
        for (i, role) in roles.into_iter().enumerate() {
            let first = NameGenerator::first_name(&mut ctx.rng);
            let last = NameGenerator::last_name(&mut ctx.rng);
            let domain = cfg.corporate_email_domain.as_str();
            let email = ctx.unique("email", |rng| NameGenerator::email(rng, first, last, domain))?;
            let phone = ctx.unique("phone", NameGenerator::phone)?;
            let employee_number = ctx.unique("employee_number", |rng| {
                format!("E{}", NameGenerator::digits(rng, 6))
            })?;

            let hired_at = within_last_days(now, cfg.hire_window_days, &mut ctx.rng);
            let termination_date = if terminated.contains(&i) {
                Some(between(hired_at, cfg.hire_window_days, now, &mut ctx.rng).date())
            } else {
                None
            };

            // Managers come from employees already created in this phase.
            let manager_id = if i > 0 && ctx.rng.chance(cfg.managed_ratio) {
                Some(out[ctx.rng.next_u64_below(i as u64) as usize].employee_id.clone())
            } else {
                None
            };

            let salary_range = cfg.salaries.get(&role).copied().unwrap_or(cfg.fallback_salary);
            let department_id = cfg
                .role_departments
                .get(&role)
                .and_then(|code| department_by_code.get(code.as_str()))
                .map(|id| id.to_string());

            out.push(EmployeeRecord {
                employee_id: ctx.new_id(EntityKind::Employee)?,
                employee_number,
                first_name: first.to_string(),
                last_name: last.to_string(),
                email,
                phone,
                department_id,
                branch_code: format!("BR{:03}", ctx.rng.range_i64(1, branches)),
                manager_id,
                hire_date: hired_at.date(),
                employment_status: if termination_date.is_some() { "terminated" } else { "active" }.to_string(),
                termination_date,
                salary: round2(salary_range.uniform(&mut ctx.rng)),
                role,
            });
        }
        Ok(out)
    }

    fn programs(&self, ctx: &mut PhaseContext<'_>, config: &GenConfig) -> GenResult<Vec<TrainingProgramRecord>> {
        let cfg = &config.workforce;
        let n = ctx.count(entity::TRAINING_PROGRAMS)?;
        let specs = take_fixed(entity::TRAINING_PROGRAMS, &cfg.training_programs, n)?;
        let mut out = Vec::with_capacity(n);
        for spec in specs {
            out.push(TrainingProgramRecord {
                program_id: ctx.new_id(EntityKind::TrainingProgram)?,
                program_name: spec.name.clone(),
                category: spec.category.clone(),
                duration_hours: *ctx.rng.pick(&cfg.program_hours),
                offers_certification: ctx.rng.chance(cfg.certification_ratio),
            });
        }
        Ok(out)
    }
}

/// Each department is headed by one of its own employees, active ones
/// preferred. Departments nobody works in stay headless.
fn assign_heads(ctx: &mut PhaseContext<'_>, departments: &mut [DepartmentRecord], employees: &[EmployeeRecord]) {
    for department in departments.iter_mut() {
        let members: Vec<&EmployeeRecord> = employees
            .iter()
            .filter(|e| e.department_id.as_deref() == Some(department.department_id.as_str()))
            .collect();
        let active: Vec<&EmployeeRecord> = members
            .iter()
            .copied()
            .filter(|e| e.employment_status == "active")
            .collect();
        let candidates = if active.is_empty() { &members } else { &active };
        if !candidates.is_empty() {
            department.department_head_id = Some(ctx.rng.pick(candidates).employee_id.clone());
        }
    }
}

impl Phase for WorkforcePhase {
    fn name(&self) -> &'static str {
        "workforce"
    }

    fn slot(&self) -> PhaseSlot {
        PhaseSlot::Workforce
    }

    fn reads(&self) -> &'static [EntityKind] {
        &[]
    }

    fn produces(&self) -> &'static [EntityKind] {
        &[EntityKind::Department, EntityKind::Employee, EntityKind::TrainingProgram]
    }

    fn generate(&self, ctx: &mut PhaseContext<'_>) -> GenResult<PhaseOutput> {
        let workforce = self.build(ctx)?;
        let mut out = PhaseOutput::new();
        // Departments first: employees reference them.
        out.push(&workforce.departments);
        out.push(&workforce.employees);
        out.push(&workforce.programs);
        Ok(out)
    }
}
