use super::AuthStatus;

/// Who may reach a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Auth state is not known yet; ask the caller to come back.
    Wait,
    Deny,
}

pub fn guard(access: Access, status: &AuthStatus) -> GuardDecision {
    match (access, status) {
        (Access::Public, _) => GuardDecision::Allow,
        (Access::Protected, AuthStatus::Authenticated(_)) => GuardDecision::Allow,
        (Access::Protected, AuthStatus::Loading) => GuardDecision::Wait,
        (Access::Protected, AuthStatus::Unauthenticated) => GuardDecision::Deny,
    }
}
