//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::topology::TopologyConfig;

/// Holds raw topology config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawTopologyConfig {
    pub edge_count: Option<usize>,
    pub edge_ports: Option<usize>,
    pub edge_bandwidth: Option<f64>,
    pub edge_latency: Option<f64>,
    pub aggregate_count: Option<usize>,
    pub aggregate_ports: Option<usize>,
    pub aggregate_bandwidth: Option<f64>,
    pub aggregate_latency: Option<f64>,
    pub root_ports: Option<usize>,
    pub root_bandwidth: Option<f64>,
    pub root_latency: Option<f64>,
}

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawNetworkConfig {
    pub scheduling_interval: Option<f64>,
    pub mips_per_pe: Option<f64>,
    pub topology: Option<RawTopologyConfig>,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    /// Period in seconds between execution task progress updates.
    pub scheduling_interval: f64,
    /// MIPS rating of a single processing element.
    pub mips_per_pe: f64,
    /// Configuration of the switch tree.
    pub topology: TopologyConfig,
}

impl NetworkConfig {
    /// Creates simulation config with default parameter values.
    pub fn new() -> Self {
        Self {
            scheduling_interval: 1.,
            mips_per_pe: 1000.,
            topology: TopologyConfig {
                edge_count: 8,
                edge_ports: 4,
                edge_bandwidth: 100.,
                edge_latency: 0.001,
                aggregate_count: 4,
                aggregate_ports: 4,
                aggregate_bandwidth: 100.,
                aggregate_latency: 0.002,
                root_ports: 4,
                root_bandwidth: 200.,
                root_latency: 0.005,
            },
        }
    }

    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Self {
        let raw: RawNetworkConfig = serde_yaml::from_str(
            &std::fs::read_to_string(file_name).unwrap_or_else(|_| panic!("Can't read file {}", file_name)),
        )
        .unwrap_or_else(|_| panic!("Can't parse YAML from file {}", file_name));

        let defaults = Self::new();
        let raw_topology = raw.topology.unwrap_or(RawTopologyConfig {
            edge_count: None,
            edge_ports: None,
            edge_bandwidth: None,
            edge_latency: None,
            aggregate_count: None,
            aggregate_ports: None,
            aggregate_bandwidth: None,
            aggregate_latency: None,
            root_ports: None,
            root_bandwidth: None,
            root_latency: None,
        });
        Self {
            scheduling_interval: raw.scheduling_interval.unwrap_or(defaults.scheduling_interval),
            mips_per_pe: raw.mips_per_pe.unwrap_or(defaults.mips_per_pe),
            topology: TopologyConfig {
                edge_count: raw_topology.edge_count.unwrap_or(defaults.topology.edge_count),
                edge_ports: raw_topology.edge_ports.unwrap_or(defaults.topology.edge_ports),
                edge_bandwidth: raw_topology.edge_bandwidth.unwrap_or(defaults.topology.edge_bandwidth),
                edge_latency: raw_topology.edge_latency.unwrap_or(defaults.topology.edge_latency),
                aggregate_count: raw_topology.aggregate_count.unwrap_or(defaults.topology.aggregate_count),
                aggregate_ports: raw_topology.aggregate_ports.unwrap_or(defaults.topology.aggregate_ports),
                aggregate_bandwidth: raw_topology
                    .aggregate_bandwidth
                    .unwrap_or(defaults.topology.aggregate_bandwidth),
                aggregate_latency: raw_topology.aggregate_latency.unwrap_or(defaults.topology.aggregate_latency),
                root_ports: raw_topology.root_ports.unwrap_or(defaults.topology.root_ports),
                root_bandwidth: raw_topology.root_bandwidth.unwrap_or(defaults.topology.root_bandwidth),
                root_latency: raw_topology.root_latency.unwrap_or(defaults.topology.root_latency),
            },
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::new()
    }
}
