//! Catalogue of offshore roles offered by the calculator.

use crate::data::Complexity;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub complexity: Complexity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub tasks: &'static [TaskDefinition],
    /// Risks that come with the role regardless of team shape.
    pub inherent_risks: &'static [&'static str],
}

impl RoleDefinition {
    pub fn task(&self, task_id: &str) -> Option<&'static TaskDefinition> {
        self.tasks.iter().find(|t| t.id == task_id)
    }
}

const fn task(id: &'static str, name: &'static str, complexity: Complexity) -> TaskDefinition {
    TaskDefinition {
        id,
        name,
        complexity,
    }
}

pub const ROLES: &[RoleDefinition] = &[
    RoleDefinition {
        id: "assistant_property_manager",
        title: "Assistant Property Manager",
        description: "Supports property managers with tenancy administration and owner communication",
        tasks: &[
            task("tenant_communication", "Tenant communication", Complexity::Low),
            task("routine_inspections", "Routine inspection scheduling", Complexity::Low),
            task("bond_lodgement", "Bond lodgement", Complexity::Low),
            task("lease_renewals", "Lease renewals", Complexity::Medium),
            task("rent_arrears", "Rent arrears follow-up", Complexity::Medium),
            task("owner_reporting", "Owner reporting", Complexity::Medium),
            task("maintenance_requests", "Maintenance request handling", Complexity::Medium),
            task("compliance_tracking", "Compliance tracking", Complexity::High),
        ],
        inherent_risks: &[
            "Regulatory compliance oversight required for tenancy legislation",
            "Owner relationships depend on consistent communication quality",
        ],
    },
    RoleDefinition {
        id: "leasing_coordinator",
        title: "Leasing Coordinator",
        description: "Runs the leasing pipeline from listing to signed lease",
        tasks: &[
            task("listing_preparation", "Listing preparation", Complexity::Low),
            task("enquiry_management", "Enquiry management", Complexity::Low),
            task("open_home_scheduling", "Open home scheduling", Complexity::Low),
            task("application_processing", "Application processing", Complexity::Medium),
            task("tenant_screening", "Tenant screening", Complexity::Medium),
            task("lease_preparation", "Lease preparation", Complexity::High),
        ],
        inherent_risks: &["Tenant screening decisions require local legislative knowledge"],
    },
    RoleDefinition {
        id: "property_accountant",
        title: "Property Accountant",
        description: "Maintains trust accounts, disbursements and financial reporting",
        tasks: &[
            task("invoice_processing", "Invoice processing", Complexity::Low),
            task("arrears_reporting", "Arrears reporting", Complexity::Low),
            task("creditor_payments", "Creditor payments", Complexity::Medium),
            task("owner_disbursements", "Owner disbursements", Complexity::Medium),
            task("trust_reconciliation", "Trust account reconciliation", Complexity::High),
            task("month_end_reporting", "End of month reporting", Complexity::High),
        ],
        inherent_risks: &["Trust accounting requires audit-ready controls and access segregation"],
    },
    RoleDefinition {
        id: "maintenance_coordinator",
        title: "Maintenance Coordinator",
        description: "Coordinates work orders, trades and repair follow-up",
        tasks: &[
            task("work_orders", "Work order creation", Complexity::Low),
            task("maintenance_follow_up", "Maintenance follow-up", Complexity::Low),
            task("tradesperson_liaison", "Tradesperson liaison", Complexity::Medium),
            task("quote_comparison", "Quote comparison", Complexity::Medium),
            task("urgent_repairs", "Urgent repairs triage", Complexity::High),
        ],
        inherent_risks: &["After-hours urgent repairs need a local escalation path"],
    },
    RoleDefinition {
        id: "admin_assistant",
        title: "Administrative Assistant",
        description: "General administration across the property management office",
        tasks: &[
            task("data_entry", "Data entry", Complexity::Low),
            task("document_management", "Document management", Complexity::Low),
            task("email_management", "Email inbox management", Complexity::Low),
            task("key_register", "Key register", Complexity::Low),
            task("database_updates", "CRM and database updates", Complexity::Medium),
        ],
        inherent_risks: &[],
    },
];

pub fn find_role(role_id: &str) -> Option<&'static RoleDefinition> {
    ROLES.iter().find(|r| r.id == role_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_role_ids_unique() {
        let ids: HashSet<_> = ROLES.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), ROLES.len());
    }

    #[test]
    fn test_task_ids_unique_within_role() {
        for role in ROLES {
            let ids: HashSet<_> = role.tasks.iter().map(|t| t.id).collect();
            assert_eq!(ids.len(), role.tasks.len(), "duplicate task in {}", role.id);
        }
    }

    #[test]
    fn test_find_role() {
        let role = find_role("leasing_coordinator").unwrap();
        assert_eq!(role.title, "Leasing Coordinator");
        assert_eq!(
            role.task("lease_preparation").map(|t| t.complexity),
            Some(Complexity::High)
        );
        assert!(find_role("astronaut").is_none());
    }
}
