//! Deterministic person, contact and address generation.
//!
//! Every draw goes through the caller's GenRng, so the same phase
//! stream yields the same people. Uniqueness is not handled here;
//! callers route emails and phones through the uniqueness ledger.

use crate::rng::GenRng;

/// A generated person: name parts plus a postal address.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub street: String,
    pub city: &'static str,
    pub state: &'static str,
    pub zip_code: String,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn address(&self) -> String {
        format!("{}, {}, {} {}", self.street, self.city, self.state, self.zip_code)
    }
}

pub struct NameGenerator;

impl NameGenerator {
    pub fn person(rng: &mut GenRng) -> Person {
        let (city, state) = *rng.pick(CITIES);
        Person {
            first_name: Self::first_name(rng),
            last_name: Self::last_name(rng),
            street: Self::street_address(rng),
            city,
            state,
            zip_code: format!("{:05}", rng.range_i64(10_000, 99_899)),
        }
    }

    pub fn first_name(rng: &mut GenRng) -> &'static str {
        *rng.pick(FIRST_NAMES)
    }

    pub fn last_name(rng: &mut GenRng) -> &'static str {
        *rng.pick(LAST_NAMES)
    }

    pub fn full_name(rng: &mut GenRng) -> String {
        format!("{} {}", Self::first_name(rng), Self::last_name(rng))
    }

    pub fn street_address(rng: &mut GenRng) -> String {
        let number = rng.range_i64(1, 9_999);
        let name = rng.pick(STREET_NAMES);
        let suffix = rng.pick(STREET_SUFFIXES);
        format!("{number} {name} {suffix}")
    }

    /// `first.last<nn>@domain`, lowercased. The numeric tail widens the
    /// space so repeated names still find a free address.
    pub fn email(rng: &mut GenRng, first: &str, last: &str, domain: &str) -> String {
        let tail = rng.next_u64_below(1_000);
        format!(
            "{}.{}{tail}@{domain}",
            first.to_lowercase(),
            last.to_lowercase().replace(' ', "")
        )
    }

    pub fn personal_email(rng: &mut GenRng, first: &str, last: &str) -> String {
        let domain = *rng.pick(EMAIL_DOMAINS);
        Self::email(rng, first, last, domain)
    }

    /// `NXX-NXX-XXXX`, fits a VARCHAR(20).
    pub fn phone(rng: &mut GenRng) -> String {
        format!(
            "{}-{}-{}",
            rng.range_i64(200, 999),
            rng.range_i64(200, 999),
            rng.range_i64(1_000, 9_999)
        )
    }

    /// Fixed-width decimal string, first digit non-zero.
    pub fn digits(rng: &mut GenRng, width: u32) -> String {
        let lo = 10i64.pow(width - 1);
        let hi = 10i64.pow(width) - 1;
        rng.range_i64(lo, hi).to_string()
    }

    pub fn vehicle(rng: &mut GenRng, newest_year: i32) -> String {
        let year = rng.range_i64(newest_year as i64 - 9, newest_year as i64);
        let make = rng.pick(VEHICLE_MAKES);
        let body = rng.pick(BODY_STYLES);
        format!("{year} {make} {body}")
    }
}

const FIRST_NAMES: &[&str] = &[
    "Aiden", "Amara", "Beatriz", "Caleb", "Chloe", "Dante", "Delia", "Elena", "Emeka", "Farah",
    "Felix", "Gemma", "Hector", "Hana", "Imani", "Ivan", "Jasmine", "Joaquin", "Keiko", "Kofi",
    "Leila", "Liam", "Maya", "Marcus", "Nadia", "Nikhil", "Omar", "Olga", "Priya", "Quentin",
    "Rosa", "Rafael", "Sana", "Stefan", "Tamara", "Tobias", "Uma", "Victor", "Wendy", "Wei",
    "Ximena", "Yusuf", "Yara", "Zane", "Zoe", "Andre", "Bianca", "Connor", "Daria", "Elliot",
    "Fiona", "Gideon", "Harper", "Isaac", "Juniper", "Kenji", "Lucia", "Mateo", "Noor", "Owen",
];

const LAST_NAMES: &[&str] = &[
    "Abara", "Bergstrom", "Castellano", "Delacroix", "Eriksen", "Fairbanks", "Gallagher",
    "Haddad", "Ishikawa", "Jovanovic", "Kowalski", "Lindqvist", "Mbeki", "Nakamura", "Okafor",
    "Petrov", "Quintero", "Rasmussen", "Sandoval", "Takahashi", "Underwood", "Valdez",
    "Whitaker", "Xiong", "Yilmaz", "Zielinski", "Acheampong", "Brennan", "Chowdhury", "Dubois",
    "Esposito", "Fitzgerald", "Grünewald", "Hoang", "Iverson", "Jablonski", "Kaur", "Lachance",
    "Moreau", "Novak", "O'Brien", "Pacheco", "Reyes", "Sato", "Thornton", "Van Dyke",
    "Whitfield", "Yamamoto", "Zamora", "Alvarado", "Bhatt", "Coates", "Drummond", "Eze",
];

const CITIES: &[(&str, &str)] = &[
    ("Springfield", "IL"),
    ("Riverton", "WY"),
    ("Fairview", "OR"),
    ("Georgetown", "TX"),
    ("Madison", "WI"),
    ("Franklin", "TN"),
    ("Salem", "MA"),
    ("Clinton", "IA"),
    ("Arlington", "VA"),
    ("Ashland", "KY"),
    ("Burlington", "VT"),
    ("Dayton", "OH"),
    ("Greenville", "SC"),
    ("Hudson", "NY"),
    ("Lakewood", "CO"),
    ("Marion", "IN"),
    ("Newport", "RI"),
    ("Oxford", "MS"),
    ("Plymouth", "MN"),
    ("Winchester", "NV"),
];

const STREET_NAMES: &[&str] = &[
    "Maple", "Cedar", "Harbor", "Willow", "Ridge", "Lakeview", "Sunset", "Prospect", "Juniper",
    "Meadow", "Orchard", "Granite", "Hillcrest", "Birch", "Chestnut", "Riverside", "Summit",
];

const STREET_SUFFIXES: &[&str] = &["St", "Ave", "Rd", "Ln", "Blvd", "Dr", "Ct", "Way"];

const EMAIL_DOMAINS: &[&str] = &[
    "mailbox.example", "inbox.example", "post.example", "webmail.example", "letters.example",
];

const VEHICLE_MAKES: &[&str] = &[
    "Toyota", "Ford", "Honda", "Subaru", "Hyundai", "Kia", "Mazda", "Volkswagen", "Chevrolet",
];

const BODY_STYLES: &[&str] = &["Sedan", "SUV", "Truck", "Coupe", "Van"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_stream_same_people() {
        let mut a = GenRng::new(12_345);
        let mut b = GenRng::new(12_345);
        for _ in 0..20 {
            assert_eq!(NameGenerator::person(&mut a), NameGenerator::person(&mut b));
        }
    }

    #[test]
    fn contact_formats() {
        let mut rng = GenRng::new(8);
        for _ in 0..100 {
            let phone = NameGenerator::phone(&mut rng);
            assert_eq!(phone.len(), 12, "bad phone {phone}");
            assert!(phone.len() <= 20);

            let email = NameGenerator::email(&mut rng, "Ana", "Van Dyke", "bank.example");
            assert!(email.starts_with("ana.vandyke"), "bad email {email}");
            assert!(email.ends_with("@bank.example"));

            let number = NameGenerator::digits(&mut rng, 10);
            assert_eq!(number.len(), 10);
            assert!(!number.starts_with('0'));
        }
    }
}
