//! Capacity tree handed to the optimizer: site area, stations, connectors
//!
//! Every node bounds the per-phase current of itself and its children. Node
//! identifiers come from one counter per build so they are unique in a request.

use std::collections::{BTreeMap, HashSet};

use super::{efficiency_percent, ReducedTopology};
use crate::domain::{
    ChargingStation, Connector, ConnectorKey, Phase, PhaseAssignmentToGrid, PhaseCurrents,
    PhaseMask, SiteArea,
};

#[derive(Debug, Clone, PartialEq)]
pub enum FuseKind {
    SiteArea,
    ChargingStation { charging_station_id: String },
    /// Virtual station standing for one physical connector
    Connector {
        key: ConnectorKey,
        phase_to_grid: PhaseAssignmentToGrid,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fuse {
    pub id: u32,
    pub kind: FuseKind,
    /// Amps per phase
    pub capacity: PhaseCurrents,
    pub phases: PhaseMask,
    pub children: Vec<Fuse>,
}

impl Fuse {
    /// Depth first visit of the node and its descendants
    pub fn walk(&self) -> Vec<&Fuse> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct FuseTree {
    pub root: Fuse,
    /// Leaf node id of every controllable connector
    pub leaves: BTreeMap<ConnectorKey, u32>,
}

/// Phases a connector actually draws from on this site area
pub fn energized_phases(site_area: &SiteArea, connector: &Connector) -> PhaseMask {
    if site_area.is_single_phase() {
        return PhaseMask::single(Phase::L1);
    }
    match connector.number_of_connected_phases.unwrap_or(site_area.number_of_phases) {
        1 => PhaseMask::single(connector.grid_phase()),
        2 => PhaseMask {
            phase1: true,
            phase2: true,
            phase3: false,
        },
        _ => PhaseMask::ALL,
    }
}

pub struct FuseTreeBuilder<'a> {
    site_area: &'a SiteArea,
    default_efficiency_percent: f64,
    /// Connectors with a session this pass
    active_connectors: &'a HashSet<ConnectorKey>,
    next_id: u32,
}

impl<'a> FuseTreeBuilder<'a> {
    pub fn new(
        site_area: &'a SiteArea,
        default_efficiency_percent: f64,
        active_connectors: &'a HashSet<ConnectorKey>,
    ) -> Self {
        Self {
            site_area,
            default_efficiency_percent,
            active_connectors,
            next_id: 0,
        }
    }

    pub fn build(mut self, topology: &ReducedTopology) -> FuseTree {
        let root_id = self.next_id();
        let mut leaves = BTreeMap::new();
        let mut stations = Vec::new();
        for station in &topology.charging_stations {
            if let Some(fuse) = self.station_fuse(station, &mut leaves) {
                stations.push(fuse);
            }
        }
        let phases = if self.site_area.is_single_phase() {
            PhaseMask::single(Phase::L1)
        } else {
            PhaseMask::ALL
        };
        FuseTree {
            root: Fuse {
                id: root_id,
                kind: FuseKind::SiteArea,
                capacity: topology.root_capacity,
                phases,
                children: stations,
            },
            leaves,
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn station_fuse(
        &mut self,
        station: &ChargingStation,
        leaves: &mut BTreeMap<ConnectorKey, u32>,
    ) -> Option<Fuse> {
        let id = self.next_id();
        let children: Vec<Fuse> = station
            .connectors
            .iter()
            .map(|connector| {
                let leaf = self.connector_fuse(station, connector);
                if let FuseKind::Connector { key, .. } = &leaf.kind {
                    leaves.insert(key.clone(), leaf.id);
                }
                leaf
            })
            .collect();
        if children.is_empty() {
            return None;
        }
        let mut capacity = PhaseCurrents::default();
        let mut phases = PhaseMask::default();
        for child in &children {
            capacity.add(&child.capacity);
            phases.phase1 |= child.phases.phase1;
            phases.phase2 |= child.phases.phase2;
            phases.phase3 |= child.phases.phase3;
        }
        Some(Fuse {
            id,
            kind: FuseKind::ChargingStation {
                charging_station_id: station.id.clone(),
            },
            capacity,
            phases,
            children,
        })
    }

    fn connector_fuse(&mut self, station: &ChargingStation, connector: &Connector) -> Fuse {
        let key = ConnectorKey::new(station.id.clone(), connector.connector_id);
        let phases = energized_phases(self.site_area, connector);
        let charge_point = station.charge_point_of(connector);

        let mut per_phase = connector.amperage.unwrap_or(0.0) / f64::from(phases.count().max(1));
        if connector.is_dc() {
            per_phase /= efficiency_percent(charge_point, self.default_efficiency_percent) / 100.0;
        }
        if let Some(cp) = charge_point {
            let active_siblings = station
                .connectors_of(cp)
                .filter(|c| {
                    self.active_connectors
                        .contains(&ConnectorKey::new(station.id.clone(), c.connector_id))
                })
                .count();
            if cp.cannot_charge_in_parallel && active_siblings > 1 {
                per_phase = 0.0;
            } else if cp.share_power_to_all_connectors && active_siblings > 1 {
                per_phase /= active_siblings as f64;
            }
        }

        Fuse {
            id: self.next_id(),
            kind: FuseKind::Connector {
                key,
                phase_to_grid: connector.phase_assignment_to_grid.unwrap_or_default(),
            },
            capacity: phases.currents(per_phase),
            phases,
            children: Vec::new(),
        }
    }
}
