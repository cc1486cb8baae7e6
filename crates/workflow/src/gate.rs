//! Authorization gate: derives the caller's role and status from a verified
//! identity and checks it against the capability an operation requires.

use std::sync::Arc;

use chefmarket_storage::{Account, AccountStatus, AccountStore, Role, StorageError};
use tracing::{debug, warn};

use crate::error::WorkflowError;
use crate::provider::VerifiedIdentity;

/// What an operation requires of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability<'a> {
    /// Any verified identity.
    Any,
    /// Any verified identity whose account is not marked fraud.
    Active,
    /// The verified email must equal the target email, whatever the role.
    SelfOnly(&'a str),
    /// Role must be chef.
    Chef,
    /// Role must be admin.
    Admin,
    /// Role chef with this exact chef id, or role admin.
    ChefOwner(&'a str),
}

/// The authorized caller. `account` is `None` when the identity has never
/// synced a profile; such callers count as active plain users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub account: Option<Account>,
}

impl Caller {
    fn new(email: String, account: Option<Account>) -> Self {
        let (role, status) = account
            .as_ref()
            .map_or((Role::User, AccountStatus::Active), |a| (a.role, a.status));
        Self {
            email,
            role,
            status,
            account,
        }
    }

    pub fn chef_id(&self) -> Option<&str> {
        self.account.as_ref().and_then(|a| a.chef_id.as_deref())
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub struct AuthorizationGate {
    accounts: Arc<dyn AccountStore>,
}

impl AuthorizationGate {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Check `capability` for `identity`. Read-only.
    ///
    /// Fails with `Unauthorized` when no identity is present and with
    /// `Forbidden` when the identity does not satisfy the capability.
    pub async fn authorize(
        &self,
        identity: Option<&VerifiedIdentity>,
        capability: Capability<'_>,
    ) -> Result<Caller, WorkflowError> {
        let identity = identity.ok_or(WorkflowError::Unauthorized)?;

        if let Capability::SelfOnly(target) = capability {
            if identity.email != target {
                warn!(caller = %identity.email, target_email = target, "self-only access denied");
                return Err(WorkflowError::Forbidden(
                    "caller may only access their own account".to_string(),
                ));
            }
        }

        let account = match self.accounts.get_account(&identity.email).await {
            Ok(account) => Some(account),
            Err(StorageError::AccountNotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };
        let caller = Caller::new(identity.email.clone(), account);
        debug!(caller = %caller.email, role = %caller.role, ?capability, "authorizing");

        match capability {
            Capability::Any | Capability::SelfOnly(_) => Ok(caller),
            Capability::Active => {
                if caller.status == AccountStatus::Fraud {
                    warn!(caller = %caller.email, "fraud-marked account denied");
                    return Err(WorkflowError::Forbidden(
                        "account is marked as fraud".to_string(),
                    ));
                }
                Ok(caller)
            }
            Capability::Chef => require_role(caller, Role::Chef),
            Capability::Admin => require_role(caller, Role::Admin),
            Capability::ChefOwner(chef_id) => {
                if caller.is_admin() || caller.chef_id() == Some(chef_id) {
                    Ok(caller)
                } else {
                    warn!(caller = %caller.email, chef_id, "chef ownership denied");
                    Err(WorkflowError::Forbidden(format!(
                        "caller does not own chef id '{chef_id}'"
                    )))
                }
            }
        }
    }
}

fn require_role(caller: Caller, role: Role) -> Result<Caller, WorkflowError> {
    if caller.role == role {
        Ok(caller)
    } else {
        warn!(caller = %caller.email, have = %caller.role, need = %role, "role check failed");
        Err(WorkflowError::Forbidden(format!("requires role '{role}'")))
    }
}
