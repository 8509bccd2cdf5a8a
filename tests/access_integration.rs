//! ---
//! crm_section: "15-testing-qa"
//! crm_subsection: "integration-tests"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Integration tests for permission resolution and guards."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::Registry;
use r_crm_authz::{
    get_user_permissions, has_all_permissions, has_any_permission, has_permission, has_role,
    AccessMetrics, AuthSnapshot, CanAccess, Capabilities, GuardDecision, Permission,
    RecordingNavigator, Rendered, Requirement, RoleGuard, RouteGuard, RouteState, User, Views,
    DEFAULT_ROLE_PERMISSIONS,
};
use r_crm_common::AppConfig;
use r_crm_logging::AccessOutcome;
use serde_json::json;

fn user(value: serde_json::Value) -> User {
    serde_json::from_value(value).unwrap()
}

fn role_shapes(name: &str) -> Vec<User> {
    vec![
        user(json!({ "role": name })),
        user(json!({ "role": { "name": name } })),
        user(json!({ "role": { "name": name, "permission": [] } })),
        user(json!({ "role": { "name": name, "permissions": [{ "key": "leads.read" }] } })),
        user(json!({ "role": { "name": name, "permissions": ["tasks.read"] } })),
    ]
}

#[test]
fn super_admin_holds_the_whole_catalog_in_every_shape() {
    for u in role_shapes("Super Admin") {
        for permission in Permission::all() {
            assert!(has_permission(Some(&u), permission.as_str()));
        }
    }
}

#[test]
fn empty_or_absent_lists_fall_back_exactly_to_defaults() {
    for (role, defaults) in DEFAULT_ROLE_PERMISSIONS.iter() {
        let shapes = &role_shapes(role)[..3];
        for u in shapes {
            for permission in Permission::all() {
                assert_eq!(
                    has_permission(Some(u), permission.as_str()),
                    defaults.contains(&permission),
                    "{role} / {permission}"
                );
            }
        }
    }
}

#[test]
fn explicit_lists_ignore_defaults() {
    let manager = user(json!({ "role": { "name": "Manager", "permission": ["leads.read"] } }));
    assert!(DEFAULT_ROLE_PERMISSIONS.grants("Manager", "leads.create"));
    assert!(!has_permission(Some(&manager), "leads.create"));
    assert_eq!(get_user_permissions(Some(&manager)).len(), 1);

    let viewer = user(json!({ "role": { "name": "Viewer", "permission": [{ "key": "leads.read" }] } }));
    assert!(!has_permission(Some(&viewer), "leads.create"));

    let admin = user(json!({ "role": { "name": "Admin", "permission": [] } }));
    assert!(has_permission(Some(&admin), "settings.manage"));
}

#[test]
fn null_user_and_null_role_are_denied() {
    let roleless = user(json!({ "role": null, "email": "a@b.c" }));
    for subject in [None, Some(&roleless)] {
        assert!(!has_permission(subject, "leads.read"));
        assert!(!has_role(subject, "Viewer"));
        assert!(!has_any_permission(subject, &["leads.read"]));
        assert!(!has_all_permissions(subject, &["leads.read"]));
        assert!(get_user_permissions(subject).is_empty());
    }
}

#[test]
fn vacuous_truth_asymmetry_holds() {
    let u = user(json!({ "role": "Viewer" }));
    let none: [&str; 0] = [];
    assert!(has_all_permissions(Some(&u), &none));
    assert!(!has_any_permission(Some(&u), &none));
}

#[test]
fn route_guard_loading_ignores_user_and_requirement() {
    let admin = user(json!({ "role": "Super Admin" }));
    let navigator = RecordingNavigator::new();
    for subject in [None, Some(&admin)] {
        for requirement in [Requirement::Unrestricted, Requirement::permission("roles.manage")] {
            let guard = RouteGuard::new(requirement).redirect_to("/login");
            let auth = AuthSnapshot {
                user: subject,
                initialized: false,
                loading: false,
            };
            assert_eq!(guard.evaluate(&auth), RouteState::Loading);
            let rendered = guard.render(
                &auth,
                &navigator,
                Views {
                    children: || "page",
                    fallback: || "denied",
                    loading: || "spinner",
                },
            );
            assert_eq!(rendered, Rendered::Loading("spinner"));
        }
    }
    assert!(navigator.visits().is_empty());
}

#[test]
fn guards_share_resolver_from_configuration() {
    let config: AppConfig = r#"
        [roles."Sales Agent"]
        permissions = ["leads.read", "reports.view"]
    "#
    .parse()
    .unwrap();
    let resolver = config.resolver();
    let agent = user(json!({ "role": "Sales Agent" }));

    let registry = Arc::new(Registry::new());
    let metrics = AccessMetrics::new(registry).unwrap();
    let gate = CanAccess::permissions(["reports.view", "leads.read"], true)
        .with_resolver(&resolver)
        .with_metrics(metrics.clone());
    assert!(gate.decide(Some(&agent)).is_granted());

    let guard = RouteGuard::new(Requirement::permission("leads.create"))
        .with_resolver(&resolver)
        .with_metrics(metrics.clone());
    assert_eq!(guard.decide(&AuthSnapshot::ready(Some(&agent))), GuardDecision::Fallback);
    assert_eq!(metrics.count("route", AccessOutcome::Denied), 1);

    let caps = Capabilities::with_resolver(Some(&agent), &resolver);
    assert!(caps.has_permission("reports.view"));
    assert!(!caps.has_permission("tasks.create"));
}

#[test]
fn role_guard_redirects_or_falls_back() {
    let viewer = user(json!({ "role": { "name": "Viewer", "permissions": ["leads.read"] } }));
    let navigator = RecordingNavigator::new();
    let guard = RoleGuard::any_of(["Admin", "Super Admin"]).redirect_to("/unauthorized");
    assert_eq!(
        guard.render(Some(&viewer), &navigator, || "admin", || "nope"),
        Rendered::Redirected("/unauthorized".into())
    );
    assert_eq!(
        RoleGuard::role("Viewer").render(Some(&viewer), &navigator, || "ok", || "nope"),
        Rendered::Children("ok")
    );
    assert_eq!(navigator.last_path().as_deref(), Some("/unauthorized"));
}
