//! Procedural world generation.
//!
//! Generates a contention-free opening layout:
//! - One home planet per faction, each inside its own region of the map
//! - Neutral planets, about 70% scattered and 30% in clusters
//! - Rejection sampling against spacing constraints with a bounded retry
//!   budget; exhausted placements fall back to unconstrained positions
//!
//! Sampling uses a seeded ChaCha RNG and happens in floating point; final
//! coordinates are converted to fixed-point once, so the same seed and
//! config always yield the same world.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::MatchConfig;
use crate::factions::FactionId;
use crate::math::{Fixed, Vec2Fixed};
use crate::planet::{Planet, PlanetKind};
use crate::world::World;

/// Retry ceiling for one constrained placement.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 100;

/// Fewest neutral planets a world ever gets.
pub const MIN_NEUTRALS: usize = 3;

/// Map area that yields one neutral at density 1.0.
const AREA_PER_NEUTRAL: f64 = 40_000.0;

/// Share of neutrals placed by independent scattering.
const SCATTERED_SHARE: f64 = 0.7;

/// Neutrals per cluster.
const CLUSTER_SIZE: usize = 4;

/// Largest distance from a cluster center to one of its members.
const CLUSTER_SPREAD: f64 = 90.0;

/// Axis-aligned rectangle of the play area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Left edge.
    pub x0: f64,
    /// Top edge.
    pub y0: f64,
    /// Right edge.
    pub x1: f64,
    /// Bottom edge.
    pub y1: f64,
}

impl Region {
    /// Center of the region.
    #[must_use]
    pub fn centroid(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Area of the region.
    #[must_use]
    pub fn area(&self) -> f64 {
        (self.x1 - self.x0) * (self.y1 - self.y0)
    }
}

/// Split a `width` × `height` area into exactly `count` roughly equal regions.
///
/// Rows of a near-square grid; when `count` does not fill the grid, the
/// leftover cells are spread over the rows so every row spans the full width.
#[must_use]
pub fn partition(count: usize, width: f64, height: f64) -> Vec<Region> {
    if count == 0 {
        return Vec::new();
    }
    let cols = (count as f64).sqrt().ceil() as usize;
    let rows = count.div_ceil(cols);
    let base = count / rows;
    let extra = count % rows;
    let row_height = height / rows as f64;

    let mut regions = Vec::with_capacity(count);
    for row in 0..rows {
        let in_row = base + usize::from(row < extra);
        let cell_width = width / in_row as f64;
        for col in 0..in_row {
            regions.push(Region {
                x0: col as f64 * cell_width,
                y0: row as f64 * row_height,
                x1: (col + 1) as f64 * cell_width,
                y1: (row + 1) as f64 * row_height,
            });
        }
    }
    regions
}

/// Number of neutrals the generator will place for `config`.
#[must_use]
pub fn neutral_target(config: &MatchConfig) -> usize {
    let count = match config.neutral_count {
        Some(explicit) => explicit as usize,
        None => {
            let area = config.map_width * config.map_height;
            let by_area = (area / AREA_PER_NEUTRAL * config.neutral_density.max(0.0)).round();
            by_area as usize + config.factions.len() * 2
        }
    };
    count.max(MIN_NEUTRALS)
}

/// Generate the opening world for a match.
#[must_use]
pub fn generate_world(config: &MatchConfig) -> World {
    let mut placer = Placer {
        config,
        rng: ChaCha8Rng::seed_from_u64(config.seed),
        homes: Vec::new(),
        neutrals: Vec::new(),
        relaxed: 0,
    };

    placer.place_homes();

    let target = neutral_target(config);
    let scattered = ((target as f64) * SCATTERED_SHARE).round() as usize;
    let clustered = target.saturating_sub(scattered);
    for _ in 0..scattered {
        placer.place_scattered();
    }
    placer.place_clusters(clustered);

    debug!(
        seed = config.seed,
        homes = placer.homes.len(),
        neutrals = placer.neutrals.len(),
        relaxed = placer.relaxed,
        "World generated"
    );

    let max_troops = Fixed::from_num(config.max_troops);
    let planets = placer
        .homes
        .iter()
        .chain(placer.neutrals.iter())
        .map(|site| {
            let per_radius = match site.kind {
                PlanetKind::Home => config.player_troops_per_radius,
                PlanetKind::Scattered => config.neutral_troops_per_radius,
                PlanetKind::Clustered => config.cluster_troops_per_radius,
            };
            let troops = (site.radius * per_radius).round().min(config.max_troops);
            Planet::new(
                site.kind,
                Vec2Fixed::from_f64(site.x, site.y),
                Fixed::from_num(site.radius),
                site.owner,
                Fixed::from_num(troops),
                max_troops,
                Fixed::from_num(site.radius * config.production_factor),
            )
        })
        .collect();

    World::from_planets(planets)
}

#[derive(Debug, Clone, Copy)]
struct Site {
    x: f64,
    y: f64,
    radius: f64,
    kind: PlanetKind,
    owner: Option<FactionId>,
}

struct Placer<'a> {
    config: &'a MatchConfig,
    rng: ChaCha8Rng,
    homes: Vec<Site>,
    neutrals: Vec<Site>,
    relaxed: u32,
}

impl Placer<'_> {
    fn sample(&mut self, lo: f64, hi: f64) -> f64 {
        if hi > lo {
            self.rng.gen_range(lo..hi)
        } else {
            (lo + hi) / 2.0
        }
    }

    fn place_homes(&mut self) {
        let config = self.config;
        let mut regions = partition(config.factions.len(), config.map_width, config.map_height);
        regions.shuffle(&mut self.rng);

        let margin = config.player_radius + config.edge_buffer;
        for (index, region) in regions.iter().enumerate() {
            let fits =
                region.x1 - region.x0 > margin * 2.0 && region.y1 - region.y0 > margin * 2.0;
            let (x, y) = if fits {
                (
                    self.sample(region.x0 + margin, region.x1 - margin),
                    self.sample(region.y0 + margin, region.y1 - margin),
                )
            } else {
                region.centroid()
            };
            self.homes.push(Site {
                x,
                y,
                radius: config.player_radius,
                kind: PlanetKind::Home,
                owner: Some(FactionId(index as u8)),
            });
        }
    }

    fn sample_radius(&mut self) -> f64 {
        let (lo, hi) = (self.config.neutral_radius_min, self.config.neutral_radius_max);
        self.sample(lo, hi)
    }

    fn fits(&self, x: f64, y: f64, radius: f64) -> bool {
        let config = self.config;
        let edge = config.edge_buffer + radius;
        if x < edge || y < edge || x > config.map_width - edge || y > config.map_height - edge {
            return false;
        }
        let clear_of_homes = self.homes.iter().all(|home| {
            distance(x, y, home.x, home.y) >= config.min_player_neutral_distance
        });
        let clear_of_neutrals = self.neutrals.iter().all(|other| {
            distance(x, y, other.x, other.y)
                >= radius + other.radius + config.min_neutral_spacing
        });
        clear_of_homes && clear_of_neutrals
    }

    /// Any in-bounds position, ignoring spacing.
    fn unconstrained(&mut self, radius: f64) -> (f64, f64) {
        let (w, h) = (self.config.map_width, self.config.map_height);
        (self.sample(radius, w - radius), self.sample(radius, h - radius))
    }

    fn push_neutral(&mut self, x: f64, y: f64, radius: f64, kind: PlanetKind) {
        self.neutrals.push(Site {
            x,
            y,
            radius,
            kind,
            owner: None,
        });
    }

    fn place_scattered(&mut self) {
        let radius = self.sample_radius();
        let (w, h) = (self.config.map_width, self.config.map_height);
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let x = self.sample(0.0, w);
            let y = self.sample(0.0, h);
            if self.fits(x, y, radius) {
                self.push_neutral(x, y, radius, PlanetKind::Scattered);
                return;
            }
        }
        self.relaxed += 1;
        let (x, y) = self.unconstrained(radius);
        self.push_neutral(x, y, radius, PlanetKind::Scattered);
    }

    fn place_clusters(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let (w, h) = (self.config.map_width, self.config.map_height);
        let mut remaining = count;
        while remaining > 0 {
            let members = remaining.min(CLUSTER_SIZE);
            remaining -= members;

            let mut center = None;
            for _ in 0..MAX_PLACEMENT_ATTEMPTS {
                let x = self.sample(0.0, w);
                let y = self.sample(0.0, h);
                let away_from_homes = self.homes.iter().all(|home| {
                    distance(x, y, home.x, home.y)
                        >= self.config.min_player_neutral_distance + CLUSTER_SPREAD / 2.0
                });
                if away_from_homes {
                    center = Some((x, y));
                    break;
                }
            }
            let (cx, cy) = match center {
                Some(found) => found,
                None => {
                    self.relaxed += 1;
                    (self.sample(0.0, w), self.sample(0.0, h))
                }
            };

            for _ in 0..members {
                self.place_cluster_member(cx, cy);
            }
        }
    }

    fn place_cluster_member(&mut self, cx: f64, cy: f64) {
        let radius = self.sample_radius();
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let angle = self.sample(0.0, std::f64::consts::TAU);
            let reach = self.sample(0.0, CLUSTER_SPREAD);
            let x = cx + angle.cos() * reach;
            let y = cy + angle.sin() * reach;
            if self.fits(x, y, radius) {
                self.push_neutral(x, y, radius, PlanetKind::Clustered);
                return;
            }
        }
        self.relaxed += 1;
        let (x, y) = self.unconstrained(radius);
        self.push_neutral(x, y, radius, PlanetKind::Clustered);
    }
}

fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    (ax - bx).hypot(ay - by)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Color, FactionConfig};

    fn four_factions() -> MatchConfig {
        MatchConfig::default().with_factions(vec![
            FactionConfig::human("A", Color(1, 0, 0)),
            FactionConfig::bot("B", Color(2, 0, 0), "expander"),
            FactionConfig::bot("C", Color(3, 0, 0), "expander"),
            FactionConfig::bot("D", Color(4, 0, 0), "expander"),
        ])
    }

    #[test]
    fn test_partition_yields_exact_count() {
        for count in 1..=16 {
            let regions = partition(count, 1200.0, 800.0);
            assert_eq!(regions.len(), count);
            let area: f64 = regions.iter().map(Region::area).sum();
            assert!((area - 1200.0 * 800.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_one_home_per_faction() {
        let config = four_factions();
        let world = generate_world(&config);
        for index in 0..4u8 {
            let homes: Vec<_> = world
                .planets()
                .iter()
                .filter(|p| p.owner() == Some(FactionId(index)))
                .collect();
            assert_eq!(homes.len(), 1);
            assert_eq!(homes[0].kind(), PlanetKind::Home);
        }
    }

    #[test]
    fn test_neutral_troops_smaller_than_home() {
        let config = MatchConfig::default();
        let world = generate_world(&config);
        let home = world
            .planets()
            .iter()
            .find(|p| p.kind() == PlanetKind::Home)
            .map(Planet::troops)
            .unwrap();
        for planet in world.planets().iter().filter(|p| p.is_neutral()) {
            assert!(planet.troops() < home);
        }
    }

    #[test]
    fn test_cluster_troops_exceed_scattered_for_equal_size() {
        let config = MatchConfig::default();
        assert!(config.cluster_troops_per_radius > config.neutral_troops_per_radius);
        assert!(config.neutral_troops_per_radius < config.player_troops_per_radius);
    }

    #[test]
    fn test_same_seed_same_world() {
        let config = four_factions().with_seed(99);
        let a = generate_world(&config);
        let b = generate_world(&config);
        assert_eq!(a.planets(), b.planets());
    }

    #[test]
    fn test_different_seed_different_world() {
        let a = generate_world(&MatchConfig::default().with_seed(1));
        let b = generate_world(&MatchConfig::default().with_seed(2));
        assert_ne!(a.planets(), b.planets());
    }

    #[test]
    fn test_tiny_map_degrades_and_terminates() {
        let config = MatchConfig::default()
            .with_map_size(120.0, 120.0)
            .with_neutral_count(40);
        let world = generate_world(&config);
        assert_eq!(world.planets().len(), 42);
        for planet in world.planets() {
            let p = planet.position();
            assert!(p.x >= Fixed::ZERO && p.x <= Fixed::from_num(120));
            assert!(p.y >= Fixed::ZERO && p.y <= Fixed::from_num(120));
        }
    }

    #[test]
    fn test_neutral_floor() {
        let config = MatchConfig::default()
            .with_map_size(50.0, 50.0)
            .with_neutral_count(0);
        assert_eq!(neutral_target(&config), MIN_NEUTRALS);
        let world = generate_world(&config);
        assert!(world.planets().len() >= 3);
    }
}
