use std::collections::HashMap;

use async_trait::async_trait;
use harbor_day2_api::{ApiResult, RegistryClient, ResourceId, Robot, RobotScope};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::require_id;
use crate::engine::KindAdapter;
use crate::kind::ResourceKind;

/// Namespace of a system-wide robot permission.
pub const WILDCARD_NAMESPACE: &str = "*";

/// Joins the namespace and logical name of a project robot.
pub const NAMESPACE_SEPARATOR: char = '+';

/// Derives the service-visible name of a robot account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotNaming {
    prefix: String,
}

impl RobotNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `prefix + name` for the wildcard namespace, otherwise
    /// `prefix + namespace + '+' + name`.
    pub fn full_name(&self, namespace: &str, name: &str) -> String {
        if namespace == WILDCARD_NAMESPACE {
            format!("{}{}", self.prefix, name)
        } else {
            format!("{}{}{}{}", self.prefix, namespace, NAMESPACE_SEPARATOR, name)
        }
    }

    /// Full name of a declared robot, derived from its first permission.
    ///
    /// A robot without permissions is named like a system robot; the service
    /// rejects it on create.
    pub fn full_name_of(&self, robot: &Robot) -> String {
        let namespace = robot
            .permissions
            .first()
            .map_or(WILDCARD_NAMESPACE, |p| p.namespace.as_str());
        self.full_name(namespace, &robot.name)
    }
}

impl Default for RobotNaming {
    fn default() -> Self {
        Self::new("robot$")
    }
}

/// A robot account as declared in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredRobot {
    #[serde(flatten)]
    pub robot: Robot,
    /// Secret to set after create or update. Takes precedence over
    /// [`RobotSecrets`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl From<Robot> for DesiredRobot {
    fn from(robot: Robot) -> Self {
        Self {
            robot,
            secret: None,
        }
    }
}

/// Robot secrets keyed by normalized logical name.
#[derive(Clone, Default)]
pub struct RobotSecrets {
    values: HashMap<String, String>,
}

impl RobotSecrets {
    /// Secrets taken from the process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Lookup key of a logical robot name: uppercased, `-` replaced by `_`.
    pub fn key_for(name: &str) -> String {
        name.to_uppercase().replace('-', "_")
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.values.get(&Self::key_for(name)).map(String::as_str)
    }
}

impl std::fmt::Debug for RobotSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotSecrets")
            .field("entries", &self.values.len())
            .finish()
    }
}

/// Robot accounts keyed by full name, system and project level alike.
pub struct RobotAdapter<'a> {
    client: &'a dyn RegistryClient,
    naming: RobotNaming,
    secrets: RobotSecrets,
}

impl<'a> RobotAdapter<'a> {
    pub fn new(client: &'a dyn RegistryClient, naming: RobotNaming, secrets: RobotSecrets) -> Self {
        Self {
            client,
            naming,
            secrets,
        }
    }

    fn secret_for<'r>(&'r self, desired: &'r DesiredRobot) -> Option<&'r str> {
        desired
            .secret
            .as_deref()
            .or_else(|| self.secrets.lookup(&desired.robot.name))
    }

    async fn push_secret(&self, id: ResourceId, desired: &DesiredRobot) -> ApiResult<()> {
        let name = &desired.robot.name;
        match self.secret_for(desired) {
            Some(secret) => {
                debug!(robot = %name, "Setting robot secret");
                self.client.refresh_robot_secret(id, secret).await
            }
            None => {
                warn!(
                    robot = %name,
                    key = %RobotSecrets::key_for(name),
                    "No secret configured, keeping the generated one"
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<'a> KindAdapter for RobotAdapter<'a> {
    type Desired = DesiredRobot;
    type Observed = Robot;

    fn kind(&self) -> ResourceKind {
        ResourceKind::RobotAccount
    }

    fn desired_key(&self, desired: &DesiredRobot) -> String {
        self.naming.full_name_of(&desired.robot)
    }

    fn observed_key(&self, observed: &Robot) -> String {
        observed.name.clone()
    }

    async fn list(&self) -> ApiResult<Vec<Robot>> {
        let mut robots = self.client.list_robots(RobotScope::System).await?;
        for project in self.client.list_projects(None).await? {
            let Some(project_id) = project.project_id else {
                continue;
            };
            robots.extend(self.client.list_robots(RobotScope::Project(project_id)).await?);
        }
        Ok(robots)
    }

    /// The service prefixes the submitted name itself, so the logical name
    /// is sent.
    async fn create(&self, desired: &DesiredRobot) -> ApiResult<()> {
        let created = self.client.create_robot(&desired.robot).await?;
        info!(robot = %created.name, id = created.id, "Created robot account");
        self.push_secret(created.id, desired).await
    }

    async fn update(&self, observed: &Robot, desired: &DesiredRobot) -> ApiResult<()> {
        let id = require_id(observed.id, "robot", &observed.name)?;
        let mut robot = desired.robot.clone();
        robot.id = Some(id);
        robot.name = self.naming.full_name_of(&desired.robot);
        if robot.level.is_none() {
            robot.level = observed.level.clone();
        }
        self.client.update_robot(id, &robot).await?;
        self.push_secret(id, desired).await
    }

    async fn delete(&self, observed: &Robot) -> ApiResult<()> {
        let id = require_id(observed.id, "robot", &observed.name)?;
        self.client.delete_robot(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_day2_api::RobotPermission;
    use serde_json::{Map, json};

    fn robot(name: &str, namespace: &str) -> Robot {
        Robot {
            id: None,
            name: name.to_string(),
            level: None,
            permissions: vec![RobotPermission {
                namespace: namespace.to_string(),
                attributes: Map::new(),
            }],
            attributes: Map::new(),
        }
    }

    #[test]
    fn test_full_name_depends_on_first_namespace() {
        let naming = RobotNaming::new("robot$");
        assert_eq!(naming.full_name_of(&robot("ci", "*")), "robot$ci");
        assert_eq!(naming.full_name_of(&robot("ci", "p1")), "robot$p1+ci");
        assert_ne!(
            naming.full_name_of(&robot("ci", "p1")),
            naming.full_name_of(&robot("ci", "p2"))
        );

        let mut bare = robot("ci", "*");
        bare.permissions.clear();
        assert_eq!(naming.full_name_of(&bare), "robot$ci");
    }

    #[test]
    fn test_secret_key_normalization() {
        assert_eq!(RobotSecrets::key_for("ci-push-bot"), "CI_PUSH_BOT");
        let secrets = RobotSecrets::from_pairs([("CI_PUSH_BOT", "s3cret")]);
        assert_eq!(secrets.lookup("ci-push-bot"), Some("s3cret"));
        assert_eq!(secrets.lookup("other"), None);
    }

    #[test]
    fn test_desired_robot_splits_secret_from_payload() {
        let desired: DesiredRobot = serde_json::from_value(json!({
            "name": "ci",
            "duration": -1,
            "permissions": [{"kind": "project", "namespace": "p1", "access": []}],
            "secret": "from-document"
        }))
        .unwrap();

        assert_eq!(desired.secret.as_deref(), Some("from-document"));
        assert!(!desired.robot.attributes.contains_key("secret"));
        assert_eq!(desired.robot.attributes["duration"], json!(-1));
    }
}
