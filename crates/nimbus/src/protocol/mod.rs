mod messages;
pub mod topic;

pub use messages::{
    AlertPayload, Assignment, BeliefPayload, ControlCommand, DataPayload, FeedbackKind,
    FeedbackPayload, PresencePayload, PresenceStatus, Rejection,
};
pub use topic::{belief_wildcard, QosClass, Topic, TopicError, CONTROL_GROUP_ID, TOPIC_ROOT};
