//! Wire format of the charging optimizer
//!
//! Node and car identifiers are plain integers; the car `name` carries the
//! `station~connector` tag the response is matched back with.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Reoptimize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_type: EventType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerRequest {
    pub event: Event,
    pub state: OptimizerState,
}

impl OptimizerRequest {
    pub fn reoptimize(state: OptimizerState) -> Self {
        Self {
            event: Event {
                event_type: EventType::Reoptimize,
            },
            state,
        }
    }

    /// Request with a zero capacity root and no cars, used to probe the endpoint
    pub fn probe() -> Self {
        Self::reoptimize(OptimizerState {
            fuse_tree: FuseTreeDto {
                root_fuse: FuseDto {
                    id: 0,
                    phase1: 0.0,
                    phase2: 0.0,
                    phase3: 0.0,
                    children: Vec::new(),
                },
            },
            cars: Vec::new(),
            car_assignments: Vec::new(),
            current_time_seconds: 0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerState {
    pub fuse_tree: FuseTreeDto,
    pub cars: Vec<CarDto>,
    pub car_assignments: Vec<CarAssignment>,
    /// Seconds since the quarter-hour the plan starts at
    pub current_time_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuseTreeDto {
    #[serde(with = "tagged_root")]
    pub root_fuse: FuseDto,
}

/// The root goes out with the same `@type` tag as every other node
mod tagged_root {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{FuseDto, FuseNode};

    #[derive(Serialize)]
    #[serde(tag = "@type")]
    enum RootRef<'a> {
        Fuse(&'a FuseDto),
    }

    pub fn serialize<S: Serializer>(root: &FuseDto, serializer: S) -> Result<S::Ok, S::Error> {
        RootRef::Fuse(root).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FuseDto, D::Error> {
        match FuseNode::deserialize(deserializer)? {
            FuseNode::Fuse(root) => Ok(root),
            FuseNode::ChargingStation(_) => Err(D::Error::custom("root node must be a Fuse")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum FuseNode {
    Fuse(FuseDto),
    ChargingStation(ChargingStationDto),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuseDto {
    pub id: u32,
    pub phase1: f64,
    pub phase2: f64,
    pub phase3: f64,
    pub children: Vec<FuseNode>,
}

/// Leaf of the tree: one physical connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingStationDto {
    pub id: u32,
    pub fuse_phase1: f64,
    pub fuse_phase2: f64,
    pub fuse_phase3: f64,
    /// Station phase number to grid phase number
    pub phase_to_grid: BTreeMap<u8, u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarTag {
    #[default]
    Car,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CarType {
    #[default]
    Bev,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarDto {
    #[serde(rename = "@type", default)]
    pub tag: CarTag,
    pub id: u32,
    /// `station~connector` correlation tag
    pub name: String,
    pub car_type: CarType,
    /// Seconds after the plan start, 0 when the session began earlier
    pub timestamp_arrival: i64,
    pub max_capacity: f64,
    pub min_loading_state: f64,
    pub start_capacity: f64,
    pub charged_capacity: f64,
    pub min_current: f64,
    pub min_current_per_phase: f64,
    pub max_current: f64,
    pub max_current_per_phase: f64,
    pub suggested_current: f64,
    pub can_use_variable_power: bool,
    pub immediate_start: bool,
    pub charging_started: bool,
    pub can_load_phase1: u8,
    pub can_load_phase2: u8,
    pub can_load_phase3: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarAssignment {
    #[serde(rename = "carID")]
    pub car_id: u32,
    #[serde(rename = "chargingStationID")]
    pub charging_station_id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerResponse {
    #[serde(default)]
    pub cars: Vec<PlannedCar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedCar {
    #[serde(default)]
    pub id: Option<u32>,
    pub name: String,
    /// Per-phase amps, one value per 15 minute slot
    #[serde(default)]
    pub current_plan: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fuse_nodes_are_type_tagged() {
        let node = FuseNode::Fuse(FuseDto {
            id: 1,
            phase1: 32.0,
            phase2: 32.0,
            phase3: 32.0,
            children: vec![FuseNode::ChargingStation(ChargingStationDto {
                id: 2,
                fuse_phase1: 32.0,
                fuse_phase2: 32.0,
                fuse_phase3: 32.0,
                phase_to_grid: BTreeMap::from([(1, 1), (2, 2), (3, 3)]),
            })],
        });
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["@type"], "Fuse");
        assert_eq!(value["children"][0]["@type"], "ChargingStation");
        assert_eq!(value["children"][0]["fusePhase1"], 32.0);
        assert_eq!(value["children"][0]["phaseToGrid"]["2"], 2);
    }

    #[test]
    fn test_probe_request_shape() {
        let value = serde_json::to_value(OptimizerRequest::probe()).unwrap();
        assert_eq!(value["event"]["eventType"], "Reoptimize");
        assert_eq!(value["state"]["fuseTree"]["rootFuse"]["id"], 0);
        assert_eq!(value["state"]["fuseTree"]["rootFuse"]["@type"], "Fuse");
        assert_eq!(value["state"]["carAssignments"], json!([]));
        assert_eq!(value["state"]["currentTimeSeconds"], 0);
    }

    #[test]
    fn test_root_fuse_reads_back_and_rejects_station_root() {
        let tree: FuseTreeDto = serde_json::from_value(json!({
            "rootFuse": {
                "@type": "Fuse", "id": 0, "phase1": 32.0, "phase2": 32.0, "phase3": 32.0,
                "children": []
            }
        }))
        .unwrap();
        assert_eq!(tree.root_fuse.phase1, 32.0);

        let station_root = serde_json::from_value::<FuseTreeDto>(json!({
            "rootFuse": {
                "@type": "ChargingStation", "id": 1, "fusePhase1": 16.0, "fusePhase2": 16.0,
                "fusePhase3": 16.0, "phaseToGrid": {}
            }
        }));
        assert!(station_root
            .unwrap_err()
            .to_string()
            .contains("root node must be a Fuse"));
    }

    #[test]
    fn test_car_assignment_field_names() {
        let value = serde_json::to_value(CarAssignment {
            car_id: 3,
            charging_station_id: 3,
        })
        .unwrap();
        assert_eq!(value, json!({ "carID": 3, "chargingStationID": 3 }));
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let response: OptimizerResponse = serde_json::from_value(json!({
            "cars": [
                { "name": "CS1~1", "currentPlan": [16.0, 16.0] },
                { "id": 4, "name": "CS1~2" }
            ]
        }))
        .unwrap();
        assert_eq!(response.cars[0].current_plan, vec![16.0, 16.0]);
        assert_eq!(response.cars[1].id, Some(4));
        assert!(response.cars[1].current_plan.is_empty());
    }
}
