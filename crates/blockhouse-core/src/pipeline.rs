//! Replica Pipelines
//!
//! A *pipeline* is the ordered set of datanodes replicating a container,
//! identified by an opaque pipeline id and carrying the replication config
//! the container was written with.
//!
//! The read path never needs the full replication strength: reads always go
//! over a standalone (single-replica) variant synthesized from the original
//! config, which avoids consensus coordination for data that is immutable
//! once committed. [`Pipeline::for_read`] produces that variant.

use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

/// Opaque pipeline identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(Uuid);

impl PipelineId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How many replicas a config asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationFactor {
    One,
    Three,
}

impl ReplicationFactor {
    pub fn count(&self) -> usize {
        match self {
            ReplicationFactor::One => 1,
            ReplicationFactor::Three => 3,
        }
    }
}

/// Replication type plus factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationConfig {
    /// No consensus; a fixed replica set written directly.
    Standalone(ReplicationFactor),
    /// Consensus-replicated writes.
    Replicated(ReplicationFactor),
}

impl ReplicationConfig {
    pub fn factor(&self) -> ReplicationFactor {
        match self {
            ReplicationConfig::Standalone(f) | ReplicationConfig::Replicated(f) => *f,
        }
    }

    pub fn is_standalone(&self) -> bool {
        matches!(self, ReplicationConfig::Standalone(_))
    }
}

/// One datanode endpoint in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatanodeDetails {
    pub uuid: Uuid,
    /// Host:port the replica client dials.
    pub address: String,
}

impl DatanodeDetails {
    pub fn new(uuid: Uuid, address: impl Into<String>) -> Self {
        Self {
            uuid,
            address: address.into(),
        }
    }
}

/// Ordered set of datanodes replicating a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub id: PipelineId,
    pub replication: ReplicationConfig,
    pub nodes: Vec<DatanodeDetails>,
}

impl Pipeline {
    pub fn new(id: PipelineId, replication: ReplicationConfig, nodes: Vec<DatanodeDetails>) -> Self {
        Self {
            id,
            replication,
            nodes,
        }
    }

    /// The standalone variant of this pipeline used for reads, preserving
    /// the replication factor and the node set.
    pub fn for_read(&self) -> Pipeline {
        Pipeline {
            id: self.id,
            replication: ReplicationConfig::Standalone(self.replication.factor()),
            nodes: self.nodes.clone(),
        }
    }

    /// True when both pipelines address the same set of datanodes. Used by
    /// the read path to decide whether a refreshed pipeline is worth
    /// adopting.
    pub fn same_datanodes(&self, other: &Pipeline) -> bool {
        let ours: HashSet<Uuid> = self.nodes.iter().map(|n| n.uuid).collect();
        let theirs: HashSet<Uuid> = other.nodes.iter().map(|n| n.uuid).collect();
        ours == theirs
    }

    pub fn first_node(&self) -> Option<&DatanodeDetails> {
        self.nodes.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(addr: &str) -> DatanodeDetails {
        DatanodeDetails::new(Uuid::new_v4(), addr)
    }

    fn pipeline(replication: ReplicationConfig, nodes: Vec<DatanodeDetails>) -> Pipeline {
        Pipeline::new(PipelineId::random(), replication, nodes)
    }

    #[test]
    fn test_for_read_synthesizes_standalone() {
        let p = pipeline(
            ReplicationConfig::Replicated(ReplicationFactor::Three),
            vec![node("dn1:9859"), node("dn2:9859"), node("dn3:9859")],
        );
        let read = p.for_read();
        assert!(read.replication.is_standalone());
        assert_eq!(read.replication.factor(), ReplicationFactor::Three);
        assert_eq!(read.nodes, p.nodes);
        assert_eq!(read.id, p.id);
    }

    #[test]
    fn test_for_read_on_standalone_is_identity() {
        let p = pipeline(
            ReplicationConfig::Standalone(ReplicationFactor::One),
            vec![node("dn1:9859")],
        );
        assert_eq!(p.for_read(), p);
    }

    #[test]
    fn test_same_datanodes_ignores_order() {
        let a = node("dn1:9859");
        let b = node("dn2:9859");
        let p1 = pipeline(
            ReplicationConfig::Standalone(ReplicationFactor::Three),
            vec![a.clone(), b.clone()],
        );
        let p2 = pipeline(
            ReplicationConfig::Standalone(ReplicationFactor::Three),
            vec![b, a],
        );
        assert!(p1.same_datanodes(&p2));
    }

    #[test]
    fn test_same_datanodes_disjoint() {
        let p1 = pipeline(
            ReplicationConfig::Standalone(ReplicationFactor::One),
            vec![node("dn1:9859")],
        );
        let p2 = pipeline(
            ReplicationConfig::Standalone(ReplicationFactor::One),
            vec![node("dn9:9859")],
        );
        assert!(!p1.same_datanodes(&p2));
    }
}
