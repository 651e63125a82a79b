//! Method invocation records and their resolution.
//!
//! The surrounding application hands over a raw key-value record; this module
//! maps it to a validated parameter set in one place, so every default,
//! sentinel and cluster-count floor is auditable here instead of being
//! scattered through the methods.

use log::warn;

use crate::error::{Result, ShapeletError};
use crate::response::ShapeletOrder;

/// Symmetry class of a self-assembled pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternOrder {
    Stripe,
    Square,
    Hexagonal,
}

impl PatternOrder {
    /// Minimum viable cluster count for defect identification.
    pub fn min_clusters(self) -> usize {
        match self {
            PatternOrder::Stripe => 4,
            PatternOrder::Square => 8,
            PatternOrder::Hexagonal => 10,
        }
    }

    /// Degree of rotational symmetry of the matching filter.
    pub fn symmetry(self) -> u32 {
        match self {
            PatternOrder::Stripe => 1,
            PatternOrder::Square => 4,
            PatternOrder::Hexagonal => 6,
        }
    }

    /// Upper bound of the orientation range, 2*pi / m.
    pub fn max_angle(self) -> f32 {
        2.0 * std::f32::consts::PI / self.symmetry() as f32
    }
}

/// Reference region for the response distance method. `Interactive` defers
/// the selection to the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceRegion {
    Bounds { ux: [usize; 2], uy: [usize; 2] },
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    ResponseDistance,
    IdentifyDefects,
    Orientation,
    GalaxyDecompose,
}

/// Raw method record as supplied by the configuration layer. `None` fields
/// carry the "default" sentinel of the corresponding key.
#[derive(Debug, Clone, Default)]
pub struct MethodConfig {
    pub shapelet_order: Option<u32>,
    pub num_clusters: Option<usize>,
    pub ux: Option<[usize; 2]>,
    pub uy: Option<[usize; 2]>,
    pub pattern_order: Option<PatternOrder>,
    pub compression_order: Option<usize>,
}

/// Fully resolved parameter record, ready for the method implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedMethod {
    ResponseDistance {
        shapelet_order: ShapeletOrder,
        /// 0 means "score against the whole reference set, unclustered".
        num_clusters: usize,
        region: ReferenceRegion,
    },
    IdentifyDefects {
        pattern_order: PatternOrder,
        num_clusters: usize,
    },
    Orientation {
        pattern_order: PatternOrder,
    },
    GalaxyDecompose {
        n_max: u32,
        compression_order: usize,
    },
}

const DEFAULT_RD_CLUSTERS: usize = 20;
const DEFAULT_N_MAX: u32 = 10;
const DEFAULT_COMPRESSION_ORDER: usize = 25;

fn resolve_order(raw: Option<u32>) -> Result<ShapeletOrder> {
    match raw {
        None => Ok(ShapeletOrder::Default),
        Some(0) => Err(ShapeletError::InvalidConfig(
            "shapelet_order must be >= 1".into(),
        )),
        Some(m) => Ok(ShapeletOrder::Max(m)),
    }
}

fn require_pattern(raw: Option<PatternOrder>) -> Result<PatternOrder> {
    raw.ok_or_else(|| {
        ShapeletError::InvalidConfig("pattern_order is required and has no default".into())
    })
}

/// Map a raw record onto a validated one. Malformed or missing required
/// parameters fail here, before any processing starts; a below-floor cluster
/// count is the single deliberate exception and is raised instead.
pub fn resolve(kind: MethodKind, raw: &MethodConfig) -> Result<ResolvedMethod> {
    match kind {
        MethodKind::ResponseDistance => {
            let region = match (raw.ux, raw.uy) {
                (Some(ux), Some(uy)) => {
                    if ux[0] > ux[1] || uy[0] > uy[1] {
                        return Err(ShapeletError::InvalidConfig(format!(
                            "reference bounds must be ordered, got x={ux:?} y={uy:?}"
                        )));
                    }
                    ReferenceRegion::Bounds { ux, uy }
                }
                (None, None) => ReferenceRegion::Interactive,
                _ => {
                    return Err(ShapeletError::InvalidConfig(
                        "ux and uy must be given together".into(),
                    ))
                }
            };
            Ok(ResolvedMethod::ResponseDistance {
                shapelet_order: resolve_order(raw.shapelet_order)?,
                num_clusters: raw.num_clusters.unwrap_or(DEFAULT_RD_CLUSTERS),
                region,
            })
        }
        MethodKind::IdentifyDefects => {
            let pattern_order = require_pattern(raw.pattern_order)?;
            let floor = pattern_order.min_clusters();
            let num_clusters = match raw.num_clusters {
                Some(k) if k < floor => {
                    warn!("raising num_clusters from {k} to the {pattern_order:?} floor of {floor}");
                    floor
                }
                Some(k) => k,
                None => floor,
            };
            Ok(ResolvedMethod::IdentifyDefects {
                pattern_order,
                num_clusters,
            })
        }
        MethodKind::Orientation => Ok(ResolvedMethod::Orientation {
            pattern_order: require_pattern(raw.pattern_order)?,
        }),
        MethodKind::GalaxyDecompose => {
            let compression_order = raw.compression_order.unwrap_or(DEFAULT_COMPRESSION_ORDER);
            if compression_order == 0 {
                return Err(ShapeletError::InvalidConfig(
                    "compression_order must be >= 1".into(),
                ));
            }
            Ok(ResolvedMethod::GalaxyDecompose {
                n_max: raw.shapelet_order.unwrap_or(DEFAULT_N_MAX),
                compression_order,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_resolves_to_the_estimator_path() {
        let raw = MethodConfig {
            ux: Some([0, 10]),
            uy: Some([0, 10]),
            ..MethodConfig::default()
        };
        let resolved = resolve(MethodKind::ResponseDistance, &raw).unwrap();
        match resolved {
            ResolvedMethod::ResponseDistance {
                shapelet_order,
                num_clusters,
                region,
            } => {
                assert_eq!(shapelet_order, ShapeletOrder::Default);
                assert_eq!(num_clusters, 20);
                assert_eq!(
                    region,
                    ReferenceRegion::Bounds {
                        ux: [0, 10],
                        uy: [0, 10]
                    }
                );
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn zero_clusters_survives_as_a_sentinel() {
        let raw = MethodConfig {
            num_clusters: Some(0),
            ..MethodConfig::default()
        };
        let resolved = resolve(MethodKind::ResponseDistance, &raw).unwrap();
        assert!(matches!(
            resolved,
            ResolvedMethod::ResponseDistance {
                num_clusters: 0,
                ..
            }
        ));
    }

    #[test]
    fn hexagonal_defaults_to_ten_clusters() {
        let raw = MethodConfig {
            pattern_order: Some(PatternOrder::Hexagonal),
            ..MethodConfig::default()
        };
        let resolved = resolve(MethodKind::IdentifyDefects, &raw).unwrap();
        assert!(matches!(
            resolved,
            ResolvedMethod::IdentifyDefects {
                num_clusters: 10,
                ..
            }
        ));
    }

    #[test]
    fn below_floor_equals_floor() {
        let below = MethodConfig {
            pattern_order: Some(PatternOrder::Square),
            num_clusters: Some(3),
            ..MethodConfig::default()
        };
        let at_floor = MethodConfig {
            pattern_order: Some(PatternOrder::Square),
            num_clusters: Some(8),
            ..MethodConfig::default()
        };
        assert_eq!(
            resolve(MethodKind::IdentifyDefects, &below).unwrap(),
            resolve(MethodKind::IdentifyDefects, &at_floor).unwrap()
        );
    }

    #[test]
    fn missing_pattern_order_is_an_error() {
        let raw = MethodConfig::default();
        assert!(resolve(MethodKind::Orientation, &raw).is_err());
        assert!(resolve(MethodKind::IdentifyDefects, &raw).is_err());
    }

    #[test]
    fn malformed_bounds_are_an_error() {
        let raw = MethodConfig {
            ux: Some([10, 2]),
            uy: Some([0, 5]),
            ..MethodConfig::default()
        };
        assert!(resolve(MethodKind::ResponseDistance, &raw).is_err());

        let half = MethodConfig {
            ux: Some([0, 5]),
            ..MethodConfig::default()
        };
        assert!(resolve(MethodKind::ResponseDistance, &half).is_err());
    }

    #[test]
    fn galaxy_defaults() {
        let resolved = resolve(MethodKind::GalaxyDecompose, &MethodConfig::default()).unwrap();
        assert_eq!(
            resolved,
            ResolvedMethod::GalaxyDecompose {
                n_max: 10,
                compression_order: 25
            }
        );

        let zero = MethodConfig {
            compression_order: Some(0),
            ..MethodConfig::default()
        };
        assert!(resolve(MethodKind::GalaxyDecompose, &zero).is_err());
    }

    #[test]
    fn pattern_geometry() {
        assert_eq!(PatternOrder::Stripe.symmetry(), 1);
        assert_eq!(PatternOrder::Square.symmetry(), 4);
        assert_eq!(PatternOrder::Hexagonal.symmetry(), 6);
        assert!((PatternOrder::Hexagonal.max_angle() - std::f32::consts::PI / 3.0).abs() < 1e-6);
    }
}
