//! ---
//! crm_section: "06-security-access-control"
//! crm_subsection: "module"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Inline, route, and role access guards."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
//! Access guards built on the resolver.
//!
//! All three guards share one decision shape: no user goes down the denied
//! path, otherwise the predicate picks the granted or denied path. Only the
//! route and role guards may redirect; the inline gate only ever swaps in its
//! fallback. Guards keep no state between evaluations.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use r_crm_logging::{crm_debug, log_access_event, AccessOutcome, LogContext};

use crate::metrics::AccessMetrics;
use crate::resolver::{default_resolver, PermissionResolver};
use crate::subject::User;

/// Authentication signals read from application state.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthSnapshot<'a> {
    /// Current user; `None` while unauthenticated.
    pub user: Option<&'a User>,
    /// Whether the authentication bootstrap has completed.
    pub initialized: bool,
    /// Whether an authentication request is in flight.
    pub loading: bool,
}

impl<'a> AuthSnapshot<'a> {
    /// Bootstrap finished, nothing in flight.
    pub fn ready(user: Option<&'a User>) -> Self {
        Self {
            user,
            initialized: true,
            loading: false,
        }
    }

    /// Bootstrap not finished yet.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Mark an authentication request as in flight.
    pub fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    fn is_settling(&self) -> bool {
        !self.initialized || self.loading
    }
}

/// How a permission list is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequireMode {
    /// Every permission must be held.
    All,
    /// One permission is enough.
    #[default]
    Any,
}

impl RequireMode {
    /// `All` when `require_all` is set, else `Any`.
    pub fn from_flag(require_all: bool) -> Self {
        if require_all {
            RequireMode::All
        } else {
            RequireMode::Any
        }
    }
}

/// Capability a guard checks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Requirement {
    /// No gating; always satisfied for a present user.
    #[default]
    Unrestricted,
    /// A single permission key.
    Permission(String),
    /// A permission list combined with `mode`.
    Permissions {
        /// Permission keys.
        keys: Vec<String>,
        /// Combination rule.
        mode: RequireMode,
    },
}

impl Requirement {
    /// Single-permission requirement.
    pub fn permission(key: impl AsRef<str>) -> Self {
        Requirement::Permission(key.as_ref().to_owned())
    }

    /// List requirement; `require_all` picks all-of over any-of. An empty list
    /// is the same as no requirement.
    pub fn permissions<I, S>(keys: I, require_all: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_owned()).collect();
        if keys.is_empty() {
            return Requirement::Unrestricted;
        }
        Requirement::Permissions {
            keys,
            mode: RequireMode::from_flag(require_all),
        }
    }

    /// Build from the loose inputs guards accept: a single permission wins over a
    /// list, and neither means unrestricted.
    pub fn from_parts(permission: Option<&str>, permissions: &[String], require_all: bool) -> Self {
        match permission.filter(|p| !p.is_empty()) {
            Some(key) => Requirement::permission(key),
            None if !permissions.is_empty() => {
                Requirement::permissions(permissions, require_all)
            }
            None => Requirement::Unrestricted,
        }
    }

    /// Whether `user` satisfies this requirement. Absent users never do.
    pub fn is_satisfied(&self, resolver: &PermissionResolver, user: Option<&User>) -> bool {
        if user.is_none() {
            return false;
        }
        match self {
            Requirement::Unrestricted => true,
            Requirement::Permissions { keys, .. } if keys.is_empty() => true,
            Requirement::Permission(key) => resolver.has_permission(user, key),
            Requirement::Permissions {
                keys,
                mode: RequireMode::All,
            } => resolver.has_all_permissions(user, keys),
            Requirement::Permissions {
                keys,
                mode: RequireMode::Any,
            } => resolver.has_any_permission(user, keys),
        }
    }

    fn label(&self) -> String {
        match self {
            Requirement::Unrestricted => String::new(),
            Requirement::Permission(key) => key.clone(),
            Requirement::Permissions { keys, .. } => keys.join(","),
        }
    }
}

/// Options passed along with a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

impl NavigateOptions {
    /// Options used by every guard redirect.
    pub const REPLACE: NavigateOptions = NavigateOptions { replace: true };
}

/// Routing primitive supplied by the host application.
pub trait Navigator {
    /// Move to `path`. Fire-and-forget.
    fn navigate(&self, path: &str, options: NavigateOptions);
}

impl<F> Navigator for F
where
    F: Fn(&str, NavigateOptions),
{
    fn navigate(&self, path: &str, options: NavigateOptions) {
        self(path, options)
    }
}

/// Navigator that records every request; used by tests and the CLI.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<(String, NavigateOptions)>>,
}

impl RecordingNavigator {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far, oldest first.
    pub fn visits(&self) -> Vec<(String, NavigateOptions)> {
        self.visits.lock().clone()
    }

    /// Most recent target path.
    pub fn last_path(&self) -> Option<String> {
        self.visits.lock().last().map(|(path, _)| path.clone())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str, options: NavigateOptions) {
        self.visits.lock().push((path.to_owned(), options));
    }
}

/// What a guard decided, before any view is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Authentication still settling; show the loading view.
    Loading,
    /// Show the guarded children.
    Granted,
    /// Show the fallback view.
    Fallback,
    /// Navigate to the path (replacing history).
    Redirect(String),
}

impl GuardDecision {
    /// Whether the children are shown.
    pub fn is_granted(&self) -> bool {
        matches!(self, GuardDecision::Granted)
    }
}

/// Result of rendering a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<T> {
    /// Guarded children.
    Children(T),
    /// Fallback view.
    Fallback(T),
    /// Loading indicator.
    Loading(T),
    /// A redirect was issued; nothing rendered.
    Redirected(String),
}

impl<T> Rendered<T> {
    /// Rendered view, if any.
    pub fn into_view(self) -> Option<T> {
        match self {
            Rendered::Children(view) | Rendered::Fallback(view) | Rendered::Loading(view) => {
                Some(view)
            }
            Rendered::Redirected(_) => None,
        }
    }

    /// Redirect target, if one was issued.
    pub fn redirect(&self) -> Option<&str> {
        match self {
            Rendered::Redirected(path) => Some(path),
            _ => None,
        }
    }
}

/// Views a guard may produce, built lazily.
pub struct Views<C, F, L> {
    /// Builds the guarded children.
    pub children: C,
    /// Builds the fallback.
    pub fallback: F,
    /// Builds the loading indicator (route guard only).
    pub loading: L,
}

impl<T, C, F> Views<C, F, fn() -> T>
where
    C: FnOnce() -> T,
    F: FnOnce() -> T,
    T: Default,
{
    /// Views without a dedicated loading indicator; loading renders `T::default()`.
    pub fn new(children: C, fallback: F) -> Self {
        Self {
            children,
            fallback,
            loading: T::default,
        }
    }
}

fn dispatch<T, C, F, L>(
    decision: GuardDecision,
    navigator: &dyn Navigator,
    views: Views<C, F, L>,
) -> Rendered<T>
where
    C: FnOnce() -> T,
    F: FnOnce() -> T,
    L: FnOnce() -> T,
{
    match decision {
        GuardDecision::Loading => Rendered::Loading((views.loading)()),
        GuardDecision::Granted => Rendered::Children((views.children)()),
        GuardDecision::Fallback => Rendered::Fallback((views.fallback)()),
        GuardDecision::Redirect(path) => {
            navigator.navigate(&path, NavigateOptions::REPLACE);
            Rendered::Redirected(path)
        }
    }
}

fn report(
    guard: &str,
    subject: &str,
    decision: &GuardDecision,
    metrics: Option<&AccessMetrics>,
) {
    let outcome = match decision {
        GuardDecision::Loading => return,
        GuardDecision::Granted => AccessOutcome::Granted,
        GuardDecision::Fallback => AccessOutcome::Denied,
        GuardDecision::Redirect(_) => AccessOutcome::Redirected,
    };
    let mut ctx = LogContext::new().with_guard(guard).with_permission(subject);
    if let GuardDecision::Redirect(path) = decision {
        ctx = ctx.with_route(path);
    }
    log_access_event(Some(&ctx), "guard.decision", outcome.as_str(), outcome);
    if let Some(metrics) = metrics {
        metrics.record(guard, outcome);
    }
}

/// Inline conditional-render gate.
#[derive(Debug, Clone)]
pub struct CanAccess<'r> {
    requirement: Requirement,
    resolver: &'r PermissionResolver,
    metrics: Option<AccessMetrics>,
}

impl CanAccess<'static> {
    /// Gate on `requirement` using the built-in policy.
    pub fn new(requirement: Requirement) -> Self {
        Self {
            requirement,
            resolver: default_resolver(),
            metrics: None,
        }
    }

    /// Gate on a single permission.
    pub fn permission(key: impl AsRef<str>) -> Self {
        Self::new(Requirement::permission(key))
    }

    /// Gate on a permission list.
    pub fn permissions<I, S>(keys: I, require_all: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(Requirement::permissions(keys, require_all))
    }
}

impl<'r> CanAccess<'r> {
    /// Evaluate against `resolver` instead of the built-in policy.
    pub fn with_resolver<'n>(self, resolver: &'n PermissionResolver) -> CanAccess<'n> {
        CanAccess {
            requirement: self.requirement,
            resolver,
            metrics: self.metrics,
        }
    }

    /// Count decisions in `metrics`.
    pub fn with_metrics(mut self, metrics: AccessMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Requirement checked by this gate.
    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Granted or fallback; never loading, never redirect.
    pub fn decide(&self, user: Option<&User>) -> GuardDecision {
        let decision = if self.requirement.is_satisfied(self.resolver, user) {
            GuardDecision::Granted
        } else {
            GuardDecision::Fallback
        };
        report("inline", &self.requirement.label(), &decision, self.metrics.as_ref());
        decision
    }

    /// Build the children when granted, otherwise the fallback.
    pub fn render<T>(
        &self,
        user: Option<&User>,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> Rendered<T> {
        match self.decide(user) {
            GuardDecision::Granted => Rendered::Children(children()),
            _ => Rendered::Fallback(fallback()),
        }
    }
}

/// Lifecycle states of a route guard evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    /// Authentication not settled; show the loading view.
    Loading,
    /// Settled with no user.
    Unauthenticated,
    /// Settled with a user; requirement not yet checked.
    Evaluating,
    /// Requirement satisfied.
    Granted,
    /// Requirement not satisfied.
    Denied,
}

impl RouteState {
    /// Entry state for a fresh evaluation of `auth`.
    pub fn enter(auth: &AuthSnapshot<'_>) -> Self {
        if auth.is_settling() {
            RouteState::Loading
        } else if auth.user.is_none() {
            RouteState::Unauthenticated
        } else {
            RouteState::Evaluating
        }
    }

    /// Whether no further transition applies.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RouteState::Evaluating)
    }
}

/// Route-level guard with an authentication lifecycle and redirect-on-deny.
#[derive(Debug, Clone)]
pub struct RouteGuard<'r> {
    requirement: Requirement,
    redirect_to: Option<String>,
    resolver: &'r PermissionResolver,
    metrics: Option<AccessMetrics>,
}

impl RouteGuard<'static> {
    /// Guard on `requirement` using the built-in policy.
    pub fn new(requirement: Requirement) -> Self {
        Self {
            requirement,
            redirect_to: None,
            resolver: default_resolver(),
            metrics: None,
        }
    }
}

impl<'r> RouteGuard<'r> {
    /// Redirect to `path` on deny or missing user instead of rendering the fallback.
    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = Some(path.into()).filter(|p: &String| !p.is_empty());
        self
    }

    /// Evaluate against `resolver` instead of the built-in policy.
    pub fn with_resolver<'n>(self, resolver: &'n PermissionResolver) -> RouteGuard<'n> {
        RouteGuard {
            requirement: self.requirement,
            redirect_to: self.redirect_to,
            resolver,
            metrics: self.metrics,
        }
    }

    /// Count decisions in `metrics`.
    pub fn with_metrics(mut self, metrics: AccessMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Apply one transition to `state`.
    pub fn step(&self, state: RouteState, auth: &AuthSnapshot<'_>) -> RouteState {
        match state {
            RouteState::Evaluating => {
                if self.requirement.is_satisfied(self.resolver, auth.user) {
                    RouteState::Granted
                } else {
                    RouteState::Denied
                }
            }
            terminal => terminal,
        }
    }

    /// Run the state machine for `auth` to a terminal state.
    pub fn evaluate(&self, auth: &AuthSnapshot<'_>) -> RouteState {
        let mut state = RouteState::enter(auth);
        while !state.is_terminal() {
            state = self.step(state, auth);
        }
        crm_debug!(
            context = LogContext::new().with_guard("route"),
            "route guard settled in {:?}",
            state
        );
        state
    }

    /// Map the terminal state to a decision.
    pub fn decide(&self, auth: &AuthSnapshot<'_>) -> GuardDecision {
        let decision = match self.evaluate(auth) {
            RouteState::Loading => GuardDecision::Loading,
            RouteState::Granted => GuardDecision::Granted,
            RouteState::Unauthenticated | RouteState::Denied | RouteState::Evaluating => self
                .redirect_to
                .clone()
                .map_or(GuardDecision::Fallback, GuardDecision::Redirect),
        };
        report("route", &self.requirement.label(), &decision, self.metrics.as_ref());
        decision
    }

    /// Decide, issue the redirect if any, and build the chosen view.
    pub fn render<T, C, F, L>(
        &self,
        auth: &AuthSnapshot<'_>,
        navigator: &dyn Navigator,
        views: Views<C, F, L>,
    ) -> Rendered<T>
    where
        C: FnOnce() -> T,
        F: FnOnce() -> T,
        L: FnOnce() -> T,
    {
        dispatch(self.decide(auth), navigator, views)
    }
}

/// Guard keyed on role names instead of permissions.
#[derive(Debug, Clone)]
pub struct RoleGuard<'r> {
    roles: Vec<String>,
    redirect_to: Option<String>,
    resolver: &'r PermissionResolver,
    metrics: Option<AccessMetrics>,
}

impl RoleGuard<'static> {
    /// Admit users holding `role`.
    pub fn role(role: impl Into<String>) -> Self {
        let role: String = role.into();
        Self::any_of([role])
    }

    /// Admit users holding any of `roles`. An empty list admits nobody.
    pub fn any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            redirect_to: None,
            resolver: default_resolver(),
            metrics: None,
        }
    }
}

impl<'r> RoleGuard<'r> {
    /// Redirect to `path` on deny instead of rendering the fallback.
    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = Some(path.into()).filter(|p: &String| !p.is_empty());
        self
    }

    /// Evaluate against `resolver` instead of the built-in policy.
    pub fn with_resolver<'n>(self, resolver: &'n PermissionResolver) -> RoleGuard<'n> {
        RoleGuard {
            roles: self.roles,
            redirect_to: self.redirect_to,
            resolver,
            metrics: self.metrics,
        }
    }

    /// Count decisions in `metrics`.
    pub fn with_metrics(mut self, metrics: AccessMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Granted on role match, else redirect-or-fallback.
    pub fn decide(&self, user: Option<&User>) -> GuardDecision {
        let granted = user.is_some() && self.resolver.has_any_role(user, &self.roles);
        let decision = if granted {
            GuardDecision::Granted
        } else {
            self.redirect_to
                .clone()
                .map_or(GuardDecision::Fallback, GuardDecision::Redirect)
        };
        report("role", &self.roles.join(","), &decision, self.metrics.as_ref());
        decision
    }

    /// Decide, issue the redirect if any, and build the chosen view.
    pub fn render<T>(
        &self,
        user: Option<&User>,
        navigator: &dyn Navigator,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> Rendered<T> {
        match self.decide(user) {
            GuardDecision::Granted => Rendered::Children(children()),
            GuardDecision::Redirect(path) => {
                navigator.navigate(&path, NavigateOptions::REPLACE);
                Rendered::Redirected(path)
            }
            GuardDecision::Fallback | GuardDecision::Loading => Rendered::Fallback(fallback()),
        }
    }
}

/// Predicates bound to one user, for conditional logic beyond rendering.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities<'a> {
    user: Option<&'a User>,
    resolver: &'a PermissionResolver,
}

impl<'a> Capabilities<'a> {
    /// Bind `user` to the built-in policy.
    pub fn new(user: Option<&'a User>) -> Self {
        Self {
            user,
            resolver: default_resolver(),
        }
    }

    /// Bind `user` to `resolver`.
    pub fn with_resolver(user: Option<&'a User>, resolver: &'a PermissionResolver) -> Self {
        Self { user, resolver }
    }

    /// Bound user.
    pub fn user(&self) -> Option<&'a User> {
        self.user
    }

    /// See [`PermissionResolver::has_permission`].
    pub fn has_permission(&self, permission: &str) -> bool {
        self.resolver.has_permission(self.user, permission)
    }

    /// See [`PermissionResolver::has_any_permission`].
    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.resolver.has_any_permission(self.user, permissions)
    }

    /// See [`PermissionResolver::has_all_permissions`].
    pub fn has_all_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.resolver.has_all_permissions(self.user, permissions)
    }

    /// See [`PermissionResolver::has_role`].
    pub fn has_role(&self, role: &str) -> bool {
        self.resolver.has_role(self.user, role)
    }

    /// See [`PermissionResolver::has_any_role`].
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.resolver.has_any_role(self.user, roles)
    }

    /// Resolved role name.
    pub fn role(&self) -> Option<&'a str> {
        self.resolver.get_user_role(self.user)
    }

    /// Effective permission keys.
    pub fn permissions(&self) -> BTreeSet<String> {
        self.resolver.get_user_permissions(self.user)
    }

    /// Whether `requirement` is satisfied.
    pub fn satisfies(&self, requirement: &Requirement) -> bool {
        requirement.is_satisfied(self.resolver, self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::RolePolicy;
    use crate::subject::RoleRef;
    use prometheus::Registry;
    use std::sync::Arc;

    fn viewer() -> User {
        User::with_role("Viewer")
    }

    fn route_views() -> Views<impl FnOnce() -> &'static str, impl FnOnce() -> &'static str, impl FnOnce() -> &'static str> {
        Views {
            children: || "page",
            fallback: || "denied",
            loading: || "spinner",
        }
    }

    #[test]
    fn inline_gate_renders_children_or_fallback() {
        let u = viewer();
        let gate = CanAccess::permission("leads.read");
        assert_eq!(gate.render(Some(&u), || "list", || "nope"), Rendered::Children("list"));
        let gate = CanAccess::permission("leads.delete");
        assert_eq!(gate.render(Some(&u), || "list", || "nope"), Rendered::Fallback("nope"));
        assert_eq!(gate.render(None, || "list", || "nope"), Rendered::Fallback("nope"));
    }

    #[test]
    fn inline_gate_without_requirement_admits_present_users_only() {
        let u = viewer();
        let gate = CanAccess::new(Requirement::Unrestricted);
        assert!(gate.decide(Some(&u)).is_granted());
        assert_eq!(gate.decide(None), GuardDecision::Fallback);
    }

    #[test]
    fn empty_permission_list_is_unrestricted_for_every_constructor() {
        let u = viewer();
        let from_parts = CanAccess::new(Requirement::from_parts(None, &[], false));
        let any = CanAccess::permissions(Vec::<&str>::new(), false);
        let all = CanAccess::permissions(Vec::<&str>::new(), true);
        assert_eq!(Requirement::permissions(Vec::<&str>::new(), true), Requirement::Unrestricted);
        for gate in [&from_parts, &any, &all] {
            assert_eq!(gate.decide(Some(&u)), GuardDecision::Granted);
            assert_eq!(gate.decide(None), GuardDecision::Fallback);
        }
        let raw = Requirement::Permissions {
            keys: Vec::new(),
            mode: RequireMode::Any,
        };
        assert!(raw.is_satisfied(default_resolver(), Some(&u)));

        let guard = RouteGuard::new(Requirement::permissions(Vec::<&str>::new(), false))
            .redirect_to("/unauthorized");
        assert_eq!(guard.decide(&AuthSnapshot::ready(Some(&u))), GuardDecision::Granted);
    }

    #[test]
    fn inline_gate_honours_require_all() {
        let u = viewer();
        let any = CanAccess::permissions(["leads.create", "leads.read"], false);
        let all = CanAccess::permissions(["leads.create", "leads.read"], true);
        assert!(any.decide(Some(&u)).is_granted());
        assert_eq!(all.decide(Some(&u)), GuardDecision::Fallback);
    }

    #[test]
    fn requirement_from_parts_prefers_single_permission() {
        let list = vec!["a.b".to_owned()];
        assert_eq!(
            Requirement::from_parts(Some("leads.read"), &list, true),
            Requirement::Permission("leads.read".into())
        );
        assert_eq!(
            Requirement::from_parts(None, &list, true),
            Requirement::Permissions {
                keys: list.clone(),
                mode: RequireMode::All
            }
        );
        assert_eq!(Requirement::from_parts(Some(""), &[], false), Requirement::Unrestricted);
    }

    #[test]
    fn route_guard_shows_loading_until_initialized() {
        let u = User::with_role("Super Admin");
        let guard = RouteGuard::new(Requirement::permission("leads.read")).redirect_to("/login");
        let nav = RecordingNavigator::new();

        let pending = AuthSnapshot {
            user: Some(&u),
            initialized: false,
            loading: false,
        };
        assert_eq!(guard.evaluate(&pending), RouteState::Loading);
        assert_eq!(guard.render(&pending, &nav, route_views()), Rendered::Loading("spinner"));

        let busy = AuthSnapshot::ready(None).with_loading(true);
        assert_eq!(guard.evaluate(&busy), RouteState::Loading);
        assert!(nav.visits().is_empty());
    }

    #[test]
    fn route_guard_redirects_unauthenticated_with_replace() {
        let guard = RouteGuard::new(Requirement::Unrestricted).redirect_to("/login");
        let nav = RecordingNavigator::new();
        let auth = AuthSnapshot::ready(None);
        assert_eq!(guard.evaluate(&auth), RouteState::Unauthenticated);
        assert_eq!(guard.render(&auth, &nav, route_views()), Rendered::Redirected("/login".into()));
        assert_eq!(nav.visits(), vec![("/login".to_owned(), NavigateOptions { replace: true })]);
    }

    #[test]
    fn route_guard_without_redirect_falls_back() {
        let u = viewer();
        let guard = RouteGuard::new(Requirement::permission("settings.manage"));
        let nav = RecordingNavigator::new();
        let auth = AuthSnapshot::ready(Some(&u));
        assert_eq!(guard.evaluate(&auth), RouteState::Denied);
        assert_eq!(guard.render(&auth, &nav, route_views()), Rendered::Fallback("denied"));
        assert!(nav.last_path().is_none());
    }

    #[test]
    fn route_guard_grants_and_steps_explicitly() {
        let u = viewer();
        let auth = AuthSnapshot::ready(Some(&u));
        let guard = RouteGuard::new(Requirement::permissions(["reports.view", "users.read"], false));
        assert_eq!(RouteState::enter(&auth), RouteState::Evaluating);
        assert_eq!(guard.step(RouteState::Evaluating, &auth), RouteState::Granted);
        assert_eq!(guard.step(RouteState::Denied, &auth), RouteState::Denied);
        let nav = RecordingNavigator::new();
        assert_eq!(guard.render(&auth, &nav, route_views()), Rendered::Children("page"));
    }

    #[test]
    fn role_guard_matches_resolved_role_name() {
        let manager = User::with_role(RoleRef::with_permissions("Manager", ["leads.read"]));
        let nav = RecordingNavigator::new();
        let guard = RoleGuard::any_of(["Admin", "Manager"]).redirect_to("/unauthorized");
        assert_eq!(guard.render(Some(&manager), &nav, || 1, || 0), Rendered::Children(1));

        let admin_only = RoleGuard::role("Admin").redirect_to("/unauthorized");
        assert_eq!(
            admin_only.render(Some(&manager), &nav, || 1, || 0),
            Rendered::Redirected("/unauthorized".into())
        );
        assert_eq!(RoleGuard::role("Admin").render(None, &nav, || 1, || 0), Rendered::Fallback(0));
        assert_eq!(nav.visits().len(), 1);
    }

    #[test]
    fn guards_use_supplied_resolver_and_metrics() {
        let resolver = PermissionResolver::new(RolePolicy::new().with_role_defaults("Viewer", ["settings.manage"]));
        let registry = Arc::new(Registry::new());
        let metrics = AccessMetrics::new(registry).unwrap();
        let u = viewer();
        let gate = CanAccess::permission("settings.manage")
            .with_resolver(&resolver)
            .with_metrics(metrics.clone());
        assert!(gate.decide(Some(&u)).is_granted());
        let guard = RouteGuard::new(Requirement::permission("leads.read"))
            .with_resolver(&resolver)
            .redirect_to("/unauthorized")
            .with_metrics(metrics.clone());
        assert_eq!(
            guard.decide(&AuthSnapshot::ready(Some(&u))),
            GuardDecision::Redirect("/unauthorized".into())
        );
        assert_eq!(metrics.count("inline", AccessOutcome::Granted), 1);
        assert_eq!(metrics.count("route", AccessOutcome::Redirected), 1);
    }

    #[test]
    fn capabilities_expose_bound_predicates() {
        let u = viewer();
        let caps = Capabilities::new(Some(&u));
        assert!(caps.has_permission("leads.read"));
        assert!(caps.has_role("Viewer"));
        assert!(!caps.has_any_role(&["Admin"]));
        assert!(caps.has_all_permissions::<&str>(&[]));
        assert_eq!(caps.role(), Some("Viewer"));
        assert!(caps.permissions().contains("reports.view"));
        assert!(caps.satisfies(&Requirement::Unrestricted));
        assert_eq!(caps.user(), Some(&u));

        let nobody = Capabilities::new(None);
        assert!(!nobody.satisfies(&Requirement::Unrestricted));
        assert!(nobody.permissions().is_empty());
    }

    #[test]
    fn closures_act_as_navigators() {
        let seen = Mutex::new(Vec::new());
        let navigator = |path: &str, options: NavigateOptions| seen.lock().push((path.to_owned(), options.replace));
        let guard = RouteGuard::new(Requirement::Unrestricted).redirect_to("/login");
        let rendered = guard.render(&AuthSnapshot::ready(None), &navigator, Views::new(|| 1u8, || 0u8));
        assert_eq!(rendered.redirect(), Some("/login"));
        assert_eq!(seen.lock().as_slice(), &[("/login".to_owned(), true)]);
    }
}
