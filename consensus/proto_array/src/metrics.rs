pub use lighthouse_metrics::*;

use crate::proto_array::ProtoArray;
use crate::vote_tracker::{ElasticList, VoteTracker};
use lazy_static::lazy_static;

lazy_static! {
    pub static ref PROTO_ARRAY_NODES: Result<IntGauge> =
        try_create_int_gauge("proto_array_nodes", "Current count of proto array nodes");
    pub static ref PROTO_ARRAY_INDICES: Result<IntGauge> =
        try_create_int_gauge("proto_array_indices", "Current count of proto array indices");
    pub static ref PROTO_ARRAY_TRACKED_VOTES: Result<IntGauge> = try_create_int_gauge(
        "proto_array_tracked_votes",
        "Current count of validators with a vote tracker"
    );
    pub static ref PROTO_ARRAY_PRUNED_NODES_TOTAL: Result<IntCounter> = try_create_int_counter(
        "proto_array_pruned_nodes_total",
        "Total count of nodes removed by pruning"
    );
    pub static ref PROTO_ARRAY_FIND_HEAD_TIMES: Result<Histogram> = try_create_histogram(
        "proto_array_find_head_seconds",
        "The duration in seconds of find_head runs"
    );
}

/// Update the global metrics `DEFAULT_REGISTRY` with info from the proto array.
pub fn scrape_for_metrics(proto_array: &ProtoArray, votes: &ElasticList<VoteTracker>) {
    set_gauge(&PROTO_ARRAY_NODES, proto_array.nodes.len() as i64);
    set_gauge(&PROTO_ARRAY_INDICES, proto_array.indices.len() as i64);
    set_gauge(&PROTO_ARRAY_TRACKED_VOTES, votes.0.len() as i64);
}
