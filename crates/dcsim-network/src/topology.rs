//! Three-level switch topology connecting hosts.
//!
//! Switches are stored in an arena indexed by [`SwitchId`]: edge switches first,
//! then aggregate switches, then the root. Hosts attach to edge switches via a
//! deterministic addressing function, so the path between any two hosts is
//! found by walking up to the lowest common ancestor.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::TopologyError;

/// Unique switch index within the topology arena.
pub type SwitchId = usize;

/// Unique host identifier.
pub type HostId = u32;

/// Level of a switch in the three-level tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SwitchLevel {
    /// Leaf switch, connects hosts.
    Edge,
    /// Middle switch, connects edge switches.
    Aggregate,
    /// Top switch, connects aggregate switches.
    Root,
}

/// A switch in the topology tree.
#[derive(Debug)]
pub struct Switch {
    /// Switch level.
    pub level: SwitchLevel,
    /// Number of downlink ports.
    pub ports: usize,
    /// Bandwidth toward the upper level.
    pub uplink_bandwidth: f64,
    /// Bandwidth toward the lower level (or hosts).
    pub downlink_bandwidth: f64,
    /// Switching delay added to every packet traversing this switch.
    pub latency: f64,
    /// Upper-level switch, `None` for the root.
    pub uplink: Option<SwitchId>,
    /// Lower-level switches (empty for edge switches).
    pub downlinks: Vec<SwitchId>,
    /// Hosts attached to this switch (edge switches only).
    pub hosts: Vec<HostId>,
}

/// Configuration of the three-level switch tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Number of edge switches.
    pub edge_count: usize,
    /// Number of host ports per edge switch.
    pub edge_ports: usize,
    /// Bandwidth of host links (edge downlink).
    pub edge_bandwidth: f64,
    /// Edge switching delay.
    pub edge_latency: f64,
    /// Number of aggregate switches.
    pub aggregate_count: usize,
    /// Number of downlink ports per aggregate switch.
    pub aggregate_ports: usize,
    /// Bandwidth of edge-aggregate links.
    pub aggregate_bandwidth: f64,
    /// Aggregate switching delay.
    pub aggregate_latency: f64,
    /// Number of downlink ports of the root switch.
    pub root_ports: usize,
    /// Bandwidth of aggregate-root links.
    pub root_bandwidth: f64,
    /// Root switching delay.
    pub root_latency: f64,
}

/// The switch tree plus the host-to-edge-switch assignment.
pub struct Topology {
    switches: Vec<Switch>,
    host_edges: FxHashMap<HostId, SwitchId>,
    edge_count: usize,
    edge_ports: usize,
}

impl Topology {
    /// Builds the three-level tree from the given configuration.
    ///
    /// Edge switches are wired to aggregate switches round-robin, aggregates to
    /// the single root. Fails with [`TopologyError::InvalidConfig`] if any level
    /// would exceed its port capacity or a parameter is out of range.
    pub fn build(config: &TopologyConfig) -> Result<Self, TopologyError> {
        if config.edge_count == 0 || config.aggregate_count == 0 {
            return Err(TopologyError::invalid_config("switch counts must be positive"));
        }
        if config.edge_ports == 0 || config.aggregate_ports == 0 || config.root_ports == 0 {
            return Err(TopologyError::invalid_config("switch port counts must be positive"));
        }
        if config.edge_bandwidth <= 0. || config.aggregate_bandwidth <= 0. || config.root_bandwidth <= 0. {
            return Err(TopologyError::invalid_config("switch bandwidths must be positive"));
        }
        if config.edge_latency < 0. || config.aggregate_latency < 0. || config.root_latency < 0. {
            return Err(TopologyError::invalid_config("switching delays must be non-negative"));
        }
        // round-robin assignment puts at most this many edges under one aggregate
        let edges_per_aggregate = (config.edge_count + config.aggregate_count - 1) / config.aggregate_count;
        if edges_per_aggregate > config.aggregate_ports {
            return Err(TopologyError::invalid_config(format!(
                "{} edge switches do not fit into {} aggregate switches with {} ports",
                config.edge_count, config.aggregate_count, config.aggregate_ports
            )));
        }
        if config.aggregate_count > config.root_ports {
            return Err(TopologyError::invalid_config(format!(
                "{} aggregate switches do not fit into the root switch with {} ports",
                config.aggregate_count, config.root_ports
            )));
        }

        let mut switches = Vec::with_capacity(config.edge_count + config.aggregate_count + 1);
        let root_id = config.edge_count + config.aggregate_count;
        for edge in 0..config.edge_count {
            let aggregate_id = config.edge_count + edge % config.aggregate_count;
            switches.push(Switch {
                level: SwitchLevel::Edge,
                ports: config.edge_ports,
                uplink_bandwidth: config.aggregate_bandwidth,
                downlink_bandwidth: config.edge_bandwidth,
                latency: config.edge_latency,
                uplink: Some(aggregate_id),
                downlinks: Vec::new(),
                hosts: Vec::new(),
            });
        }
        for aggregate in 0..config.aggregate_count {
            let downlinks = (0..config.edge_count)
                .filter(|edge| edge % config.aggregate_count == aggregate)
                .collect();
            switches.push(Switch {
                level: SwitchLevel::Aggregate,
                ports: config.aggregate_ports,
                uplink_bandwidth: config.root_bandwidth,
                downlink_bandwidth: config.aggregate_bandwidth,
                latency: config.aggregate_latency,
                uplink: Some(root_id),
                downlinks,
                hosts: Vec::new(),
            });
        }
        switches.push(Switch {
            level: SwitchLevel::Root,
            ports: config.root_ports,
            uplink_bandwidth: config.root_bandwidth,
            downlink_bandwidth: config.root_bandwidth,
            latency: config.root_latency,
            uplink: None,
            downlinks: (config.edge_count..root_id).collect(),
            hosts: Vec::new(),
        });

        Ok(Self {
            switches,
            host_edges: FxHashMap::default(),
            edge_count: config.edge_count,
            edge_ports: config.edge_ports,
        })
    }

    /// Attaches the host to its edge switch determined by the addressing
    /// function `host_id / edge_ports`.
    ///
    /// Hosts with ids in the same contiguous block of size `edge_ports` share
    /// one edge switch. Each host can be connected at most once.
    /// Returns the edge switch the host was attached to.
    pub fn connect_host(&mut self, host_id: HostId) -> Result<SwitchId, TopologyError> {
        if self.host_edges.contains_key(&host_id) {
            return Err(TopologyError::HostAlreadyConnected { host: host_id });
        }
        let edge = host_id as usize / self.edge_ports;
        if edge >= self.edge_count {
            return Err(TopologyError::HostOutOfRange {
                host: host_id,
                capacity: self.host_capacity(),
            });
        }
        let switch = &mut self.switches[edge];
        if switch.hosts.len() >= switch.ports {
            return Err(TopologyError::EdgeSwitchFull {
                switch: edge,
                ports: switch.ports,
            });
        }
        switch.hosts.push(host_id);
        self.host_edges.insert(host_id, edge);
        Ok(edge)
    }

    /// Maximum number of hosts supported by the topology.
    pub fn host_capacity(&self) -> usize {
        self.edge_count * self.edge_ports
    }

    /// Returns the edge switch of a connected host.
    pub fn edge_of_host(&self, host_id: HostId) -> Option<SwitchId> {
        self.host_edges.get(&host_id).copied()
    }

    /// Returns the switch record by its index.
    pub fn switch(&self, id: SwitchId) -> &Switch {
        &self.switches[id]
    }

    /// Total number of switches in the arena.
    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }

    /// Returns the switches a packet traverses between two hosts: up from the
    /// source edge switch to the lowest common ancestor, then down to the
    /// destination edge switch. At most edge-aggregate-root-aggregate-edge.
    ///
    /// Returns `None` if either host is not connected.
    pub fn path(&self, src_host: HostId, dst_host: HostId) -> Option<Vec<SwitchId>> {
        let src_edge = self.edge_of_host(src_host)?;
        let dst_edge = self.edge_of_host(dst_host)?;
        if src_edge == dst_edge {
            return Some(vec![src_edge]);
        }
        let src_aggregate = self.switches[src_edge].uplink.unwrap();
        let dst_aggregate = self.switches[dst_edge].uplink.unwrap();
        if src_aggregate == dst_aggregate {
            return Some(vec![src_edge, src_aggregate, dst_edge]);
        }
        let root = self.switches[src_aggregate].uplink.unwrap();
        Some(vec![src_edge, src_aggregate, root, dst_aggregate, dst_edge])
    }

    /// Computes the transfer time of `size` bytes between two hosts:
    /// the sum of switching delays along the path plus `size` divided by the
    /// minimum hop bandwidth. Switches below the lowest common ancestor on the
    /// source side contribute their uplink bandwidth, the rest their downlink
    /// bandwidth.
    pub fn transfer_time(&self, src_host: HostId, dst_host: HostId, size: u64) -> Option<f64> {
        let path = self.path(src_host, dst_host)?;
        let lca = path.len() / 2;
        let mut latency = 0.;
        let mut bandwidth = f64::INFINITY;
        for (hop, &switch_id) in path.iter().enumerate() {
            let switch = &self.switches[switch_id];
            latency += switch.latency;
            let hop_bandwidth = if hop < lca {
                switch.uplink_bandwidth
            } else {
                switch.downlink_bandwidth
            };
            bandwidth = bandwidth.min(hop_bandwidth);
        }
        Some(latency + size as f64 / bandwidth)
    }
}
