//! World-space positions of binding sites. Every stage that needs to know
//! where an arm tip or an epitope is right now goes through these functions.

use crate::state::{Antibody, Antigen};
use immuno_common::{angle_to_vec, AntibodyType, SimParams, Vec2};

/// Local forward axis of a stem or arm of the given length.
#[inline(always)]
fn forward(length: f32) -> Vec2 {
    Vec2::new(0.0, -length)
}

/// World position of the tip of arm `arm_idx`, or `None` for an invalid index.
pub fn arm_tip(antibody: &Antibody, arm_idx: usize, fab_length: f32) -> Option<Vec2> {
    let arm = antibody.arms.get(arm_idx)?;
    let body = &antibody.body;
    let tip = match antibody.kind {
        // Point-like base: every tip sits at stem + reach along its own angle.
        AntibodyType::IgM => {
            body.pos + forward(antibody.stem_length + fab_length).rotate(body.angle + arm.angle)
        }
        AntibodyType::IgG => {
            let hinge = body.pos + forward(antibody.stem_length).rotate(body.angle);
            hinge + forward(fab_length).rotate(body.angle + arm.angle)
        }
    };
    Some(tip)
}

/// World position of epitope `epitope_idx`, or `None` for an invalid index.
pub fn epitope_position(antigen: &Antigen, epitope_idx: usize, surface_offset: f32) -> Option<Vec2> {
    let epitope = antigen.epitopes.get(epitope_idx)?;
    Some(antigen.body.pos + angle_to_vec(epitope.angle).scale(antigen.radius + surface_offset))
}

/// Convenience wrappers reading the geometry constants from `params`.
pub fn tip(antibody: &Antibody, arm_idx: usize, params: &SimParams) -> Option<Vec2> {
    arm_tip(antibody, arm_idx, params.fab_length)
}

pub fn epitope(antigen: &Antigen, epitope_idx: usize, params: &SimParams) -> Option<Vec2> {
    epitope_position(antigen, epitope_idx, params.epitope_offset)
}
