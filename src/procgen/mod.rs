//! Procedural city generation.
//!
//! - Population-guided highway growth with a backtracking cursor
//! - Secondary road grids hung perpendicular off the highways
//! - Building stacks massed from footprint primitives
//! - Instance buffers ready for GPU upload

use bevy::prelude::*;
use thiserror::Error;

pub mod buildings;
pub mod cursor;
pub mod geometry;
pub mod instances;
pub mod rng;
pub mod roads;

use crate::world::fields::ScalarFields;
use crate::world::index::SpatialIndex;
use buildings::{BuildingGenerator, FootprintLibrary};
use instances::InstanceBuffer;
use rng::SineRng;
use roads::RoadNetworkGenerator;

/// Diagnostic marker layers a run can emit instead of (or on top of)
/// the road network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugOverlay {
    /// Land cells, with every tenth lane tinted.
    Terrain,
    /// Occupied fine cells.
    Occupancy,
    /// A fresh batch of sampled building sites.
    Sites,
}

#[derive(Resource, Clone)]
pub struct CityGenConfig {
    /// Map extent in fine cells.
    pub width: u32,
    pub height: u32,
    /// Half-span, in degrees, of the population search cone.
    pub highway_angle: f32,
    /// Per-step probability that a highway spawns branches.
    pub highway_density: f32,
    /// Scales the derived grid step.
    pub road_size: f32,
    /// Initial counter of the sine-hash draw sequence.
    pub seed: f32,
    /// Pins the grid step; `None` derives it from `road_size`.
    pub grid_step: Option<f32>,
    /// Whether to run the building pass.
    pub buildings: bool,
    /// Building sites requested per run.
    pub building_sites: usize,
    pub overlay: Option<DebugOverlay>,
}

impl Default for CityGenConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            highway_angle: 20.0,
            highway_density: 0.35,
            road_size: 3.0,
            seed: 15.8,
            grid_step: None,
            buildings: true,
            building_sites: 1500,
            overlay: None,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("map extent {0}x{1} is empty")]
    EmptyExtent(u32, u32),
    #[error("width {0} leaves the coarse cell below one fine cell")]
    CoarseCellTooSmall(u32),
    #[error("highway density {0} outside [0, 1]")]
    DensityOutOfRange(f32),
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },
    #[error("footprint library holds no prototypes")]
    EmptyFootprintLibrary,
}

impl CityGenConfig {
    /// Reject configurations the growth automaton cannot run on.
    /// Checked once per generation, never mid-walk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyExtent(self.width, self.height));
        }
        if self.width < 20 {
            return Err(ConfigError::CoarseCellTooSmall(self.width));
        }
        if !(0.0..=1.0).contains(&self.highway_density) {
            return Err(ConfigError::DensityOutOfRange(self.highway_density));
        }
        for (name, value) in [
            ("highway_angle", self.highway_angle),
            ("road_size", self.road_size),
            ("grid_step", self.grid_step.unwrap_or(1.0)),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

/// Event to trigger city generation.
#[derive(Event)]
pub struct GenerateCityEvent;

/// Road network instances from the latest run.
#[derive(Resource, Default)]
pub struct RoadInstances(pub InstanceBuffer);

/// Building instances from the latest run, one buffer per footprint
/// prototype, in library order.
#[derive(Resource, Default)]
pub struct BuildingInstances(pub Vec<InstanceBuffer>);

#[derive(Resource, Default)]
pub struct CityGenerated(pub bool);

pub struct ProcgenPlugin;

impl Plugin for ProcgenPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CityGenConfig>()
            .init_resource::<FootprintLibrary>()
            .init_resource::<RoadInstances>()
            .init_resource::<BuildingInstances>()
            .init_resource::<CityGenerated>()
            .add_event::<GenerateCityEvent>()
            .add_systems(Update, generate_city_on_event)
            .add_systems(Startup, trigger_initial_generation);
    }
}

fn trigger_initial_generation(mut events: EventWriter<GenerateCityEvent>) {
    events.send(GenerateCityEvent);
}

fn generate_city_on_event(
    mut events: EventReader<GenerateCityEvent>,
    mut config: ResMut<CityGenConfig>,
    library: Res<FootprintLibrary>,
    mut roads: ResMut<RoadInstances>,
    mut buildings: ResMut<BuildingInstances>,
    mut generated: ResMut<CityGenerated>,
) {
    if events.read().next().is_none() {
        return;
    }

    info!("Generating city (seed {})...", config.seed);
    match generate_city(&config, &library) {
        Ok(output) => {
            info!(
                "Generated {} road instances, {} building instances",
                output.roads.len(),
                output
                    .buildings
                    .as_deref()
                    .map(|b| b.iter().map(InstanceBuffer::len).sum::<usize>())
                    .unwrap_or(0),
            );
            roads.0 = output.roads;
            buildings.0 = output.buildings.unwrap_or_default();
            generated.0 = true;
            // Step the seed so the next event grows a different city.
            config.seed += 1.0;
        }
        Err(err) => warn!("City generation skipped: {err}"),
    }
}

/// Everything one generation run produces.
#[derive(Debug, PartialEq)]
pub struct CityOutput {
    pub roads: InstanceBuffer,
    /// `None` when the building pass is disabled.
    pub buildings: Option<Vec<InstanceBuffer>>,
}

/// Run one full generation pass: road growth, site sampling, building
/// massing, overlays. Deterministic for a fixed config.
pub fn generate_city(
    config: &CityGenConfig,
    library: &FootprintLibrary,
) -> Result<CityOutput, ConfigError> {
    config.validate()?;
    if config.buildings && library.prototypes.is_empty() {
        return Err(ConfigError::EmptyFootprintLibrary);
    }

    let fields = ScalarFields::new(config.width, config.height);
    let mut index = SpatialIndex::new(config.width, config.height);
    let mut rng = SineRng::new(config.seed);

    let mut generator = RoadNetworkGenerator::new(config, &fields, &mut index, &mut rng);
    generator.run();

    let sites = if config.buildings {
        Some(generator.generate_points(config.building_sites))
    } else {
        None
    };
    if let Some(overlay) = config.overlay {
        generator.emit_overlay(overlay);
    }
    let roads = generator.into_instances();

    let buildings = match sites {
        Some(sites) => {
            let mut generator = BuildingGenerator::new(&fields, library, &mut rng);
            generator.generate(&sites);
            Some(generator.into_buffers())
        }
        None => None,
    };

    Ok(CityOutput { roads, buildings })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert_eq!(CityGenConfig::default().validate(), Ok(()));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let base = CityGenConfig::default();

        let empty = CityGenConfig { width: 0, ..base.clone() };
        assert_eq!(empty.validate(), Err(ConfigError::EmptyExtent(0, 100)));

        let narrow = CityGenConfig { width: 12, ..base.clone() };
        assert_eq!(narrow.validate(), Err(ConfigError::CoarseCellTooSmall(12)));

        let dense = CityGenConfig {
            highway_density: 1.2,
            ..base.clone()
        };
        assert_eq!(dense.validate(), Err(ConfigError::DensityOutOfRange(1.2)));

        let flat = CityGenConfig {
            highway_angle: 0.0,
            ..base.clone()
        };
        assert!(matches!(
            flat.validate(),
            Err(ConfigError::NonPositive { name: "highway_angle", .. })
        ));

        let pinned = CityGenConfig {
            grid_step: Some(-1.0),
            ..base
        };
        assert!(matches!(
            pinned.validate(),
            Err(ConfigError::NonPositive { name: "grid_step", .. })
        ));
    }

    #[test]
    fn generation_is_deterministic() {
        let config = CityGenConfig::default();
        let library = FootprintLibrary::default();
        let a = generate_city(&config, &library).unwrap();
        let b = generate_city(&config, &library).unwrap();
        assert_eq!(a, b);
        assert!(a.roads.len() > 0);
        let buildings = a.buildings.expect("building pass enabled by default");
        assert!(buildings.iter().map(InstanceBuffer::len).sum::<usize>() > 0);
    }

    #[test]
    fn different_seeds_differ() {
        let library = FootprintLibrary::default();
        let a = generate_city(&CityGenConfig::default(), &library).unwrap();
        let b = generate_city(
            &CityGenConfig {
                seed: 99.2,
                ..CityGenConfig::default()
            },
            &library,
        )
        .unwrap();
        assert_ne!(a.roads, b.roads);
    }

    #[test]
    fn empty_footprint_library_is_rejected() {
        let empty = FootprintLibrary {
            prototypes: Vec::new(),
        };
        assert_eq!(
            generate_city(&CityGenConfig::default(), &empty),
            Err(ConfigError::EmptyFootprintLibrary)
        );
        // Without the building pass the library is never consulted.
        let config = CityGenConfig {
            buildings: false,
            ..CityGenConfig::default()
        };
        assert!(generate_city(&config, &empty).is_ok());
    }

    #[test]
    fn every_sampled_site_places_a_full_stack() {
        use super::buildings::classify;
        use super::roads::RoadNetworkGenerator;

        let config = CityGenConfig::default();
        let library = FootprintLibrary::default();
        let output = generate_city(&config, &library).unwrap();
        let total: usize = output
            .buildings
            .expect("building pass enabled by default")
            .iter()
            .map(InstanceBuffer::len)
            .sum();

        // Replay the road pass to recover the site list the run fed
        // into building generation.
        let fields = ScalarFields::new(config.width, config.height);
        let mut index = SpatialIndex::new(config.width, config.height);
        let mut rng = SineRng::new(config.seed);
        let mut generator = RoadNetworkGenerator::new(&config, &fields, &mut index, &mut rng);
        generator.run();
        let sites = generator.generate_points(config.building_sites);
        assert!(!sites.is_empty());

        let expected: usize = sites
            .iter()
            .map(|&site| {
                let class = classify(fields.population(site));
                ((class.height + 1.0) / class.gap).ceil() as usize
            })
            .sum();
        assert_eq!(total, expected);
        assert!(total >= sites.len());
    }

    #[test]
    fn disabled_building_pass_yields_none() {
        let config = CityGenConfig {
            buildings: false,
            ..CityGenConfig::default()
        };
        let output = generate_city(&config, &FootprintLibrary::default()).unwrap();
        assert!(output.buildings.is_none());
        assert!(output.roads.len() > 0);
    }

    #[test]
    fn overlay_adds_markers_on_top_of_roads() {
        let library = FootprintLibrary::default();
        let plain = generate_city(&CityGenConfig::default(), &library).unwrap();
        let overlaid = generate_city(
            &CityGenConfig {
                overlay: Some(DebugOverlay::Occupancy),
                ..CityGenConfig::default()
            },
            &library,
        )
        .unwrap();
        assert!(overlaid.roads.len() > plain.roads.len());
    }

    #[test]
    fn event_driven_generation_fills_resources() {
        let mut app = App::new();
        app.add_plugins(ProcgenPlugin);
        app.update();

        assert!(app.world().resource::<CityGenerated>().0);
        assert!(app.world().resource::<RoadInstances>().0.len() > 0);
        // The seed stepped forward for the next event.
        let seed = app.world().resource::<CityGenConfig>().seed;
        assert_eq!(seed, CityGenConfig::default().seed + 1.0);
    }
}
