use std::fmt;

use harbor_day2_api::ScheduleKind;

/// Resource kinds the operator synchronizes, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Configurations,
    Registry,
    Project,
    ProjectMember,
    RobotAccount,
    WebhookPolicy,
    ReplicationPolicy,
    PurgeJobSchedule,
    GarbageCollectionSchedule,
    RetentionPolicy,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 10] = [
        ResourceKind::Configurations,
        ResourceKind::Registry,
        ResourceKind::Project,
        ResourceKind::ProjectMember,
        ResourceKind::RobotAccount,
        ResourceKind::WebhookPolicy,
        ResourceKind::ReplicationPolicy,
        ResourceKind::PurgeJobSchedule,
        ResourceKind::GarbageCollectionSchedule,
        ResourceKind::RetentionPolicy,
    ];

    /// File name of the document describing this kind.
    pub fn document(self) -> &'static str {
        match self {
            Self::Configurations => "configurations.json",
            Self::Registry => "registries.json",
            Self::Project => "projects.json",
            Self::ProjectMember => "project-members.json",
            Self::RobotAccount => "robot-accounts.json",
            Self::WebhookPolicy => "webhooks.json",
            Self::ReplicationPolicy => "replications.json",
            Self::PurgeJobSchedule => "purge-job-schedule.json",
            Self::GarbageCollectionSchedule => "garbage-collection-schedule.json",
            Self::RetentionPolicy => "retention-policies.json",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configurations => "configurations",
            Self::Registry => "registries",
            Self::Project => "projects",
            Self::ProjectMember => "project members",
            Self::RobotAccount => "robot accounts",
            Self::WebhookPolicy => "webhook policies",
            Self::ReplicationPolicy => "replication policies",
            Self::PurgeJobSchedule => "purge-job schedule",
            Self::GarbageCollectionSchedule => "garbage-collection schedule",
            Self::RetentionPolicy => "retention policies",
        }
    }
}

impl From<ScheduleKind> for ResourceKind {
    fn from(kind: ScheduleKind) -> Self {
        match kind {
            ScheduleKind::GarbageCollection => Self::GarbageCollectionSchedule,
            ScheduleKind::PurgeAudit => Self::PurgeJobSchedule,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
