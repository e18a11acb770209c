//! Equilateral formation design.
//!
//! Deputies are placed exactly at the triangle's LVLH offsets at the
//! evaluation instant, with speeds rescaled by vis-viva to the reference
//! semi-major axis. Equal semi-major axes mean equal periods, so the
//! triangle re-forms on every revolution: a repeatable, transient formation
//! over the target.

use nalgebra::Vector3;

use orbit_propagation::constants::MU_EARTH;
use orbit_propagation::{propagation, OrbitalElements, PropagationSettings, StateVector};

use crate::frame::LvlhFrame;
use crate::Result;

/// Element sets for the full formation. Index 0 is the reference vertex.
#[derive(Debug, Clone)]
pub struct FormationDesign {
    pub elements: [OrbitalElements; 3],
    pub side_length_m: f64,
    /// Seconds past the element epoch at which the triangle is exact.
    pub evaluation_time_s: f64,
}

/// Place the two deputies at the equilateral offsets around the reference.
///
/// The triangle lies in the along-track/cross-track plane: deputy B is one
/// side length ahead along-track, deputy C sits at the apex. Deputy speeds
/// come from vis-viva at the displaced radius with the reference semi-major
/// axis, keeping all three periods identical.
pub fn design_formation(
    reference: &OrbitalElements,
    side_length_m: f64,
    evaluation_time_s: f64,
    settings: &PropagationSettings,
) -> Result<FormationDesign> {
    reference.validate()?;
    let reference = reference.normalized();

    let ref_state = propagation::state_at(&reference, evaluation_time_s, settings)?;
    let frame = LvlhFrame::from_state(&ref_state);

    let local_offsets = [
        Vector3::new(0.0, side_length_m, 0.0),
        Vector3::new(0.0, side_length_m / 2.0, side_length_m * 3.0_f64.sqrt() / 2.0),
    ];

    let mut elements = [reference, reference, reference];
    for (slot, offset) in local_offsets.iter().enumerate() {
        let position = ref_state.position + frame.to_eci(offset);
        // Vis-viva with the reference semi-major axis: same orbital energy,
        // same period, bounded along-track drift.
        let speed = (MU_EARTH
            * (2.0 / position.norm() - 1.0 / reference.semi_major_axis_m))
            .sqrt();
        let velocity = ref_state.velocity.normalize() * speed;

        let deputy_state = StateVector { t: evaluation_time_s, position, velocity };
        let at_eval = OrbitalElements::from_state_vector(&deputy_state, reference.epoch);

        // Rewind the mean anomaly to the shared epoch
        let mean_at_epoch = at_eval.mean_anomaly_deg
            - (at_eval.mean_motion() * evaluation_time_s).to_degrees();
        elements[slot + 1] = OrbitalElements {
            mean_anomaly_deg: mean_at_epoch,
            ..at_eval
        }
        .normalized();
    }

    Ok(FormationDesign { elements, side_length_m, evaluation_time_s })
}
