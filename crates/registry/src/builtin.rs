//! Built-in descriptors for the resource families verge ships support for.
//!
//! Timeouts are the per-family defaults observed in production; override by
//! constructing a modified `ResourceTypeDef` before registering.

use std::time::Duration;

use verge_core::{default_poll_interval, ResourceTypeDef, StatusClass, Timeouts};

/// Managed Kubernetes add-on, keyed `<cluster>:<addon>`. Add-ons settle
/// slowly and deletes can outlast creates by a wide margin.
pub fn eks_addon() -> ResourceTypeDef {
    ResourceTypeDef {
        name: "eks_addon",
        arity: 2,
        timeouts: Timeouts {
            create: Duration::from_secs(20 * 60),
            update: Duration::from_secs(20 * 60),
            delete: Duration::from_secs(40 * 60),
            poll_interval: default_poll_interval(),
        },
        classify_status: classify_addon_status,
        tags_via_list: false,
    }
}

fn classify_addon_status(raw: &str) -> StatusClass {
    match raw {
        "CREATING" | "UPDATING" | "DELETING" => StatusClass::Pending,
        "ACTIVE" => StatusClass::Active,
        "CREATE_FAILED" | "UPDATE_FAILED" | "DELETE_FAILED" | "DEGRADED" => StatusClass::Failed,
        // Unknown vocabulary: keep polling under the budget.
        _ => StatusClass::Pending,
    }
}

/// Serverless-search VPC endpoint, keyed by its single endpoint id.
pub fn opensearchserverless_vpc_endpoint() -> ResourceTypeDef {
    ResourceTypeDef {
        name: "opensearchserverless_vpc_endpoint",
        arity: 1,
        timeouts: Timeouts {
            create: Duration::from_secs(30 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
            poll_interval: default_poll_interval(),
        },
        classify_status: classify_endpoint_status,
        tags_via_list: false,
    }
}

fn classify_endpoint_status(raw: &str) -> StatusClass {
    match raw {
        "PENDING" | "DELETING" => StatusClass::Pending,
        "ACTIVE" => StatusClass::Active,
        "FAILED" => StatusClass::Failed,
        _ => StatusClass::Pending,
    }
}

/// Web ACL, keyed by its single id. Mutations apply synchronously, so any
/// describable state is usable and the settle budgets are short. Tags live
/// behind a separate list call, not the describe response.
pub fn waf_web_acl() -> ResourceTypeDef {
    ResourceTypeDef {
        name: "waf_web_acl",
        arity: 1,
        timeouts: Timeouts {
            create: Duration::from_secs(5 * 60),
            update: Duration::from_secs(5 * 60),
            delete: Duration::from_secs(5 * 60),
            poll_interval: default_poll_interval(),
        },
        classify_status: |_raw| StatusClass::Active,
        tags_via_list: true,
    }
}

/// All built-in descriptors.
pub fn all() -> [ResourceTypeDef; 3] {
    [eks_addon(), opensearchserverless_vpc_endpoint(), waf_web_acl()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addon_statuses_collapse_to_classes() {
        assert_eq!(classify_addon_status("CREATING"), StatusClass::Pending);
        assert_eq!(classify_addon_status("UPDATING"), StatusClass::Pending);
        assert_eq!(classify_addon_status("ACTIVE"), StatusClass::Active);
        assert_eq!(classify_addon_status("DEGRADED"), StatusClass::Failed);
        assert_eq!(classify_addon_status("DELETE_FAILED"), StatusClass::Failed);
        assert_eq!(classify_addon_status("SOMETHING_NEW"), StatusClass::Pending);
    }

    #[test]
    fn endpoint_statuses_collapse_to_classes() {
        assert_eq!(classify_endpoint_status("PENDING"), StatusClass::Pending);
        assert_eq!(classify_endpoint_status("ACTIVE"), StatusClass::Active);
        assert_eq!(classify_endpoint_status("FAILED"), StatusClass::Failed);
    }

    #[test]
    fn web_acl_is_always_usable_once_describable() {
        let def = waf_web_acl();
        assert_eq!((def.classify_status)(""), StatusClass::Active);
        assert_eq!((def.classify_status)("anything"), StatusClass::Active);
    }

    #[test]
    fn arities_match_persisted_identifier_shapes() {
        assert_eq!(eks_addon().arity, 2);
        assert_eq!(opensearchserverless_vpc_endpoint().arity, 1);
        assert_eq!(waf_web_acl().arity, 1);
    }

    #[test]
    fn only_the_web_acl_family_tags_through_the_list_call() {
        assert!(!eks_addon().tags_via_list);
        assert!(!opensearchserverless_vpc_endpoint().tags_via_list);
        assert!(waf_web_acl().tags_via_list);
    }
}
