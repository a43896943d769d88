//! Employee listing and aggregation over in-process account snapshots.

use std::cmp::Ordering;
use std::collections::HashMap;

use hrdesk_auth::{
    Account, DepartmentStats, EmployeePage, EmployeeProfile, EmployeeQuery, EmployeeStats,
    SortField, SortOrder,
};

/// Whether `account` is an employee matching every filter in `query`.
pub fn matches(account: &Account, query: &EmployeeQuery) -> bool {
    let Some(profile) = account.profile.as_employee() else {
        return false;
    };

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        if !account.name.to_lowercase().contains(&needle)
            && !account.email.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    if query.position.is_some_and(|position| position != profile.position) {
        return false;
    }
    if query.min_salary.is_some_and(|min| profile.salary < min) {
        return false;
    }
    if query.max_salary.is_some_and(|max| profile.salary > max) {
        return false;
    }
    true
}

fn employee(account: &Account) -> Option<&EmployeeProfile> {
    account.profile.as_employee()
}

fn compare(a: &Account, b: &Account, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Name => a.name.cmp(&b.name),
        SortField::Email => a.email.cmp(&b.email),
        SortField::Salary => {
            let left = employee(a).map_or(0.0, |p| p.salary);
            let right = employee(b).map_or(0.0, |p| p.salary);
            left.total_cmp(&right)
        }
        SortField::Position => {
            let left = employee(a).map(|p| p.position.as_str());
            let right = employee(b).map(|p| p.position.as_str());
            left.cmp(&right)
        }
    }
}

/// Order `accounts` by `field`; ties fall back to id so pages are stable.
pub fn sort(accounts: &mut [Account], field: SortField, order: SortOrder) {
    accounts.sort_by(|a, b| {
        let ordering = compare(a, b, field);
        let ordering = match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    });
}

/// Filter, sort and slice `accounts` into the requested page.
pub fn page(accounts: impl IntoIterator<Item = Account>, query: &EmployeeQuery) -> EmployeePage {
    let mut selected: Vec<Account> = accounts
        .into_iter()
        .filter(|account| matches(account, query))
        .collect();
    sort(&mut selected, query.sort_by, query.sort_order);

    let total = selected.len() as u64;
    let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
    let employees = selected
        .into_iter()
        .skip(offset)
        .take(query.limit as usize)
        .collect();

    EmployeePage::new(employees, query, total)
}

/// Headcount and salary totals, grouped by position, largest group first.
pub fn stats<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> EmployeeStats {
    let mut groups: HashMap<&'static str, (u64, f64)> = HashMap::new();
    let mut result = EmployeeStats::default();

    for profile in accounts.into_iter().filter_map(employee) {
        let entry = groups.entry(profile.position.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += profile.salary;
        result.total_employees += 1;
        result.total_salary += profile.salary;
    }

    result.departments = groups
        .into_iter()
        .map(|(name, (count, total))| DepartmentStats {
            name: name.to_string(),
            count,
            average_salary: total / count as f64,
        })
        .collect();
    result
        .departments
        .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    result
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use hrdesk_auth::{derive_permissions, AccountProfile, AccountStatus, Position, Role};
    use hrdesk_core::AccountId;

    use super::*;

    fn employee_account(name: &str, position: Position, salary: f64, age_minutes: i64) -> Account {
        let created = Utc::now() - Duration::minutes(age_minutes);
        Account {
            id: AccountId::new(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            role: Role::Employee,
            status: AccountStatus::Active,
            permissions: derive_permissions(Role::Employee),
            profile: AccountProfile::Employee(EmployeeProfile {
                mobile: format!("{:010}", salary as u64),
                position,
                salary,
                department: None,
                last_login: None,
                profile_image: None,
            }),
            created_at: created,
            updated_at: created,
        }
    }

    fn staff() -> Vec<Account> {
        vec![
            employee_account("Ada Lovelace", Position::SoftwareEngineer, 9000.0, 40),
            employee_account("Grace Hopper", Position::SoftwareEngineer, 8000.0, 30),
            employee_account("Mary Parker", Position::HrManager, 5000.0, 20),
            employee_account("Tom Sales", Position::SalesRepresentative, 3000.0, 10),
        ]
    }

    #[test]
    fn default_query_is_newest_first() {
        let page = page(staff(), &EmployeeQuery::default());
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.employees[0].name, "Tom Sales");
        assert_eq!(page.employees[3].name, "Ada Lovelace");
    }

    #[test]
    fn search_is_case_insensitive_over_name_and_email() {
        let query = EmployeeQuery {
            search: Some("HOPPER".to_string()),
            ..Default::default()
        };
        let page = page(staff(), &query);
        assert_eq!(page.total, 1);
        assert_eq!(page.employees[0].name, "Grace Hopper");

        let by_email = EmployeeQuery {
            search: Some("mary.parker@".to_string()),
            ..Default::default()
        };
        assert_eq!(super::page(staff(), &by_email).total, 1);
    }

    #[test]
    fn salary_range_is_inclusive_and_sortable() {
        let query = EmployeeQuery {
            min_salary: Some(5000.0),
            max_salary: Some(9000.0),
            sort_by: SortField::Salary,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let names: Vec<_> = page(staff(), &query)
            .employees
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, ["Mary Parker", "Grace Hopper", "Ada Lovelace"]);
    }

    #[test]
    fn pagination_slices_after_sorting() {
        let query = EmployeeQuery {
            page: 2,
            limit: 3,
            sort_by: SortField::Name,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let page = page(staff(), &query);
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.employees.len(), 1);
        assert_eq!(page.employees[0].name, "Tom Sales");
    }

    #[test]
    fn position_filter_is_exact() {
        let query = EmployeeQuery {
            position: Some(Position::SoftwareEngineer),
            ..Default::default()
        };
        assert_eq!(page(staff(), &query).total, 2);
    }

    #[test]
    fn stats_group_by_position() {
        let staff = staff();
        let stats = stats(&staff);
        assert_eq!(stats.total_employees, 4);
        assert_eq!(stats.total_salary, 25000.0);
        assert_eq!(stats.departments[0].name, "Software Engineer");
        assert_eq!(stats.departments[0].count, 2);
        assert_eq!(stats.departments[0].average_salary, 8500.0);
        assert_eq!(stats.departments.len(), 3);
    }
}
