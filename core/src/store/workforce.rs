use super::batch::{date, flag, int, opt_date, opt_text, real, text, Record};
use super::schema::StoreName;
use crate::workforce_phase::{DepartmentRecord, EmployeeRecord, TrainingProgramRecord};
use rusqlite::types::Value;

impl Record for DepartmentRecord {
    const STORE: StoreName = StoreName::Employees;
    const TABLE: &'static str = "departments";
    const COLUMNS: &'static [&'static str] =
        &["department_id", "code", "department_name", "department_head_id", "budget"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.department_id),
            text(&self.code),
            text(&self.department_name),
            opt_text(self.department_head_id.as_deref()),
            real(self.budget),
        ]
    }
}

impl Record for EmployeeRecord {
    const STORE: StoreName = StoreName::Employees;
    const TABLE: &'static str = "employees";
    const COLUMNS: &'static [&'static str] = &[
        "employee_id",
        "employee_number",
        "first_name",
        "last_name",
        "email",
        "phone",
        "role",
        "department_id",
        "branch_code",
        "manager_id",
        "hire_date",
        "termination_date",
        "employment_status",
        "salary",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.employee_id),
            text(&self.employee_number),
            text(&self.first_name),
            text(&self.last_name),
            text(&self.email),
            text(&self.phone),
            text(&self.role),
            opt_text(self.department_id.as_deref()),
            text(&self.branch_code),
            opt_text(self.manager_id.as_deref()),
            date(self.hire_date),
            opt_date(self.termination_date),
            text(&self.employment_status),
            real(self.salary),
        ]
    }
}

impl Record for TrainingProgramRecord {
    const STORE: StoreName = StoreName::Employees;
    const TABLE: &'static str = "training_programs";
    const COLUMNS: &'static [&'static str] =
        &["program_id", "program_name", "category", "duration_hours", "offers_certification"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.program_id),
            text(&self.program_name),
            text(&self.category),
            int(self.duration_hours),
            flag(self.offers_certification),
        ]
    }
}
