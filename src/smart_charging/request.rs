//! Optimizer request assembly from the fuse tree and session models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::schedule::{quarter_hour_anchor, seconds_since_quarter_hour};
use super::{Fuse, FuseKind, FuseTree, SessionModel};
use crate::optimizer::{
    CarAssignment, CarDto, CarTag, CarType, ChargingStationDto, FuseDto, FuseNode, FuseTreeDto,
    OptimizerRequest, OptimizerState,
};

pub fn build_request(
    tree: &FuseTree,
    models: &[SessionModel],
    now: DateTime<Utc>,
) -> OptimizerRequest {
    let anchor = quarter_hour_anchor(now);
    OptimizerRequest::reoptimize(OptimizerState {
        fuse_tree: FuseTreeDto {
            root_fuse: fuse_dto(&tree.root),
        },
        cars: models.iter().map(|m| car_dto(m, anchor)).collect(),
        car_assignments: models
            .iter()
            .map(|m| CarAssignment {
                car_id: m.id,
                charging_station_id: m.id,
            })
            .collect(),
        current_time_seconds: seconds_since_quarter_hour(now),
    })
}

fn fuse_dto(fuse: &Fuse) -> FuseDto {
    FuseDto {
        id: fuse.id,
        phase1: fuse.capacity.phase1,
        phase2: fuse.capacity.phase2,
        phase3: fuse.capacity.phase3,
        children: fuse.children.iter().map(fuse_node).collect(),
    }
}

fn fuse_node(fuse: &Fuse) -> FuseNode {
    match &fuse.kind {
        FuseKind::Connector { phase_to_grid, .. } => FuseNode::ChargingStation(ChargingStationDto {
            id: fuse.id,
            fuse_phase1: fuse.capacity.phase1,
            fuse_phase2: fuse.capacity.phase2,
            fuse_phase3: fuse.capacity.phase3,
            phase_to_grid: BTreeMap::from([
                (1, phase_to_grid.cs_phase_l1.number()),
                (2, phase_to_grid.cs_phase_l2.number()),
                (3, phase_to_grid.cs_phase_l3.number()),
            ]),
        }),
        FuseKind::SiteArea | FuseKind::ChargingStation { .. } => FuseNode::Fuse(fuse_dto(fuse)),
    }
}

fn car_dto(model: &SessionModel, anchor: DateTime<Utc>) -> CarDto {
    CarDto {
        tag: CarTag::Car,
        id: model.id,
        name: model.key.to_string(),
        car_type: CarType::Bev,
        timestamp_arrival: (model.started_at - anchor).num_seconds().max(0),
        max_capacity: model.max_capacity,
        min_loading_state: model.min_loading_state,
        start_capacity: 0.0,
        charged_capacity: model.charged_capacity,
        min_current: model.min_current,
        min_current_per_phase: model.min_current_per_phase,
        max_current: model.max_current,
        max_current_per_phase: model.max_current_per_phase,
        suggested_current: 0.0,
        can_use_variable_power: true,
        immediate_start: false,
        charging_started: true,
        can_load_phase1: u8::from(model.phases.phase1),
        can_load_phase2: u8::from(model.phases.phase2),
        can_load_phase3: u8::from(model.phases.phase3),
    }
}
