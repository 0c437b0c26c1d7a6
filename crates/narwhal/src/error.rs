#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("graph contains an edge with a missing endpoint: {id}")]
    MissingEndpoint { id: String },

    #[error("edge {edge} references node {node}, but the graph only has {node_count} nodes")]
    EdgeOutOfRange {
        edge: usize,
        node: usize,
        node_count: usize,
    },

    #[error("node {node} has an invalid mass: {mass}")]
    InvalidMass { node: usize, mass: f64 },

    #[error("edge {edge} has an invalid weight: {weight}")]
    InvalidWeight { edge: usize, weight: f64 },

    #[error("node {node} has a non-finite position or size")]
    NonFiniteNode { node: usize },

    #[error("invalid layout setting `{name}`: {value}")]
    InvalidSetting { name: &'static str, value: f64 },

    #[error("unknown force importance `{value}`")]
    UnknownImportance { value: String },

    #[error("invalid layout settings JSON: {0}")]
    SettingsJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
