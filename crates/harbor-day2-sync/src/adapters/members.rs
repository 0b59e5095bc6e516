use async_trait::async_trait;
use harbor_day2_api::{ApiResult, ProjectMember, ProjectRef, ProjectRole, RegistryClient};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::{KindAdapter, ReconcileResult, sync};
use crate::error::SyncResult;
use crate::kind::ResourceKind;

/// Membership document of one project: usernames listed per role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMembership {
    pub project_name: String,
    #[serde(default)]
    pub admin: Vec<String>,
    #[serde(default)]
    pub developer: Vec<String>,
    #[serde(default)]
    pub guest: Vec<String>,
    #[serde(default)]
    pub maintainer: Vec<String>,
}

impl ProjectMembership {
    pub fn usernames(&self, role: ProjectRole) -> &[String] {
        match role {
            ProjectRole::Admin => &self.admin,
            ProjectRole::Developer => &self.developer,
            ProjectRole::Guest => &self.guest,
            ProjectRole::Maintainer => &self.maintainer,
        }
    }

    /// Flattens the role lists into `(username, role)` pairs, roles in
    /// [`ProjectRole::ALL`] order.
    pub fn desired_members(&self) -> Vec<DesiredMember> {
        ProjectRole::ALL
            .into_iter()
            .flat_map(|role| {
                self.usernames(role).iter().map(move |username| DesiredMember {
                    username: username.clone(),
                    role,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredMember {
    pub username: String,
    pub role: ProjectRole,
}

/// Members of one project, keyed by username.
///
/// Removing a member only detaches the user from the project.
pub struct MemberAdapter<'a> {
    client: &'a dyn RegistryClient,
    project: ProjectRef,
    scope: String,
}

impl<'a> MemberAdapter<'a> {
    pub fn new(client: &'a dyn RegistryClient, project: ProjectRef) -> Self {
        let scope = project.to_string();
        Self {
            client,
            project,
            scope,
        }
    }
}

#[async_trait]
impl<'a> KindAdapter for MemberAdapter<'a> {
    type Desired = DesiredMember;
    type Observed = ProjectMember;

    fn kind(&self) -> ResourceKind {
        ResourceKind::ProjectMember
    }

    fn scope(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn desired_key(&self, desired: &DesiredMember) -> String {
        desired.username.clone()
    }

    fn observed_key(&self, observed: &ProjectMember) -> String {
        observed.entity_name.clone()
    }

    async fn list(&self) -> ApiResult<Vec<ProjectMember>> {
        self.client.list_project_members(&self.project).await
    }

    async fn create(&self, desired: &DesiredMember) -> ApiResult<()> {
        self.client
            .add_project_member(&self.project, &desired.username, desired.role)
            .await
            .map(|_| ())
    }

    async fn update(&self, observed: &ProjectMember, desired: &DesiredMember) -> ApiResult<()> {
        self.client
            .update_project_member_role(&self.project, observed.id, desired.role)
            .await
    }

    async fn delete(&self, observed: &ProjectMember) -> ApiResult<()> {
        self.client
            .remove_project_member(&self.project, observed.id)
            .await
    }
}

/// Reconciles the members of every project listed in `memberships`.
pub async fn sync_project_members(
    client: &dyn RegistryClient,
    memberships: &[ProjectMembership],
) -> SyncResult<ReconcileResult> {
    let mut result = ReconcileResult::default();
    for membership in memberships {
        let desired = membership.desired_members();
        if desired.is_empty() {
            warn!(project = %membership.project_name, "No members listed, every member will be removed");
        }
        let adapter = MemberAdapter::new(client, ProjectRef::name(membership.project_name.as_str()));
        result.merge(sync(&adapter, &desired).await?);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_lists_flatten_in_role_order() {
        let membership: ProjectMembership = serde_json::from_value(json!({
            "project_name": "p1",
            "guest": ["alice"],
            "admin": ["bob", "carol"]
        }))
        .unwrap();

        let pairs: Vec<(String, ProjectRole)> = membership
            .desired_members()
            .into_iter()
            .map(|m| (m.username, m.role))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("bob".to_string(), ProjectRole::Admin),
                ("carol".to_string(), ProjectRole::Admin),
                ("alice".to_string(), ProjectRole::Guest),
            ]
        );
    }
}
