//! Cluster and context entries.

/// A named cluster: where the API server lives and how to trust it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEntry {
    /// Server URL as written in the file; validated on resolution.
    pub server: String,
    /// Base64-encoded PEM bundle of the cluster's certificate authority.
    pub certificate_authority_data: Option<String>,
}

/// A named context: binds a cluster, an identity and a default namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub cluster: String,
    pub identity: String,
    pub namespace: Option<String>,
}
