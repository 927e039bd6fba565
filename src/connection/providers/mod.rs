//! Provider variants
//!
//! Each submodule implements [`Connection`](crate::connection::Connection)
//! for one provider. [`factory`] maps a discriminator to the constructor the
//! registry installs for it.

pub mod aws;
pub mod azure;
pub mod gcp;
pub mod jira;
pub mod okta;
pub mod opsgenie;
pub mod token;

pub use aws::{AwsConnection, AwsFields};
pub use azure::{AzureConnection, AzureFields};
pub use gcp::{GcpConnection, GcpFields};
pub use jira::{JiraConnection, JiraFields};
pub use okta::{OktaConnection, OktaFields};
pub use opsgenie::{OpsgenieConnection, OpsgenieFields};
pub use token::{
    AbuseipdbConnection, GithubConnection, GitlabConnection, PagerdutyConnection,
    SlackConnection, TeamsConnection, TokenConnection, TokenProvider, VirustotalConnection,
};

use crate::connection::registry::Factory;
use crate::connection::ConnectionType;

/// Constructor for `connection_type`
pub fn factory(connection_type: ConnectionType) -> Factory {
    match connection_type {
        ConnectionType::Abuseipdb => AbuseipdbConnection::from_attributes,
        ConnectionType::Aws => AwsConnection::from_attributes,
        ConnectionType::Azure => AzureConnection::from_attributes,
        ConnectionType::Gcp => GcpConnection::from_attributes,
        ConnectionType::Github => GithubConnection::from_attributes,
        ConnectionType::Gitlab => GitlabConnection::from_attributes,
        ConnectionType::Jira => JiraConnection::from_attributes,
        ConnectionType::Okta => OktaConnection::from_attributes,
        ConnectionType::Opsgenie => OpsgenieConnection::from_attributes,
        ConnectionType::Pagerduty => PagerdutyConnection::from_attributes,
        ConnectionType::Slack => SlackConnection::from_attributes,
        ConnectionType::Teams => TeamsConnection::from_attributes,
        ConnectionType::Virustotal => VirustotalConnection::from_attributes,
    }
}
