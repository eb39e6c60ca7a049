use crate::error::DirectoryError;
use clap::ValueEnum;
use std::collections::BTreeMap;
use std::fmt;

/// Clusters the collector knows how to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Cluster {
    Db256,
    Fs,
    Test,
}

impl Cluster {
    /// Directory key for this cluster
    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::Db256 => "db256",
            Cluster::Fs => "fs",
            Cluster::Test => "test",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a cluster to the ordered list of its server addresses
#[cfg_attr(test, mockall::automock)]
pub trait ServerDirectory {
    fn resolve(&self, cluster: &str) -> Result<Vec<String>, DirectoryError>;
}

/// Directory backed by a fixed cluster table, typically the `[clusters]`
/// section of the configuration file
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    clusters: BTreeMap<String, Vec<String>>,
}

impl StaticDirectory {
    pub fn new(clusters: BTreeMap<String, Vec<String>>) -> Self {
        Self { clusters }
    }
}

impl ServerDirectory for StaticDirectory {
    fn resolve(&self, cluster: &str) -> Result<Vec<String>, DirectoryError> {
        self.clusters
            .get(cluster)
            .cloned()
            .ok_or_else(|| DirectoryError::UnknownCluster(cluster.to_string()))
    }
}
