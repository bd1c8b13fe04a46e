//! Shared wire types: replication config, datanode details, pipelines.

use blockhouse_core::{
    DatanodeDetails, Pipeline, PipelineId, ReplicationConfig, ReplicationFactor,
};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ReplicationTypeProto {
    Replicated = 1,
    StandAlone = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ReplicationFactorProto {
    One = 1,
    Three = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DatanodeDetailsProto {
    #[prost(string, required, tag = "1")]
    pub uuid: ::prost::alloc::string::String,
    #[prost(string, required, tag = "2")]
    pub address: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PipelineProto {
    #[prost(string, required, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(enumeration = "ReplicationTypeProto", required, tag = "2")]
    pub replication_type: i32,
    #[prost(enumeration = "ReplicationFactorProto", required, tag = "3")]
    pub factor: i32,
    #[prost(message, repeated, tag = "4")]
    pub members: ::prost::alloc::vec::Vec<DatanodeDetailsProto>,
}

/// A `key: value` pair; proto2 has no native map type.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyValue {
    #[prost(string, required, tag = "1")]
    pub key: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "2")]
    pub value: ::core::option::Option<::prost::alloc::string::String>,
}

impl From<&DatanodeDetails> for DatanodeDetailsProto {
    fn from(d: &DatanodeDetails) -> Self {
        Self {
            uuid: d.uuid.to_string(),
            address: d.address.clone(),
        }
    }
}

impl From<&Pipeline> for PipelineProto {
    fn from(p: &Pipeline) -> Self {
        let (replication_type, factor) = match p.replication {
            ReplicationConfig::Standalone(f) => (ReplicationTypeProto::StandAlone, f),
            ReplicationConfig::Replicated(f) => (ReplicationTypeProto::Replicated, f),
        };
        let factor = match factor {
            ReplicationFactor::One => ReplicationFactorProto::One,
            ReplicationFactor::Three => ReplicationFactorProto::Three,
        };
        Self {
            id: p.id.to_string(),
            replication_type: replication_type as i32,
            factor: factor as i32,
            members: p.nodes.iter().map(DatanodeDetailsProto::from).collect(),
        }
    }
}

impl PipelineProto {
    /// Decode back into the model type. Unknown uuids or enum values fall
    /// back to safe defaults rather than failing the whole envelope.
    pub fn to_pipeline(&self) -> Pipeline {
        let id = Uuid::parse_str(&self.id)
            .map(PipelineId::from_uuid)
            .unwrap_or_else(|_| PipelineId::random());
        let factor = match ReplicationFactorProto::try_from(self.factor) {
            Ok(ReplicationFactorProto::Three) => ReplicationFactor::Three,
            _ => ReplicationFactor::One,
        };
        let replication = match ReplicationTypeProto::try_from(self.replication_type) {
            Ok(ReplicationTypeProto::Replicated) => ReplicationConfig::Replicated(factor),
            _ => ReplicationConfig::Standalone(factor),
        };
        let nodes = self
            .members
            .iter()
            .map(|m| DatanodeDetails {
                uuid: Uuid::parse_str(&m.uuid).unwrap_or_else(|_| Uuid::nil()),
                address: m.address.clone(),
            })
            .collect();
        Pipeline::new(id, replication, nodes)
    }
}
