use anyhow::Result;
use immuno_common::{AntibodyType, BindingTarget, ParticleId, Vec2};

/// Kinematic state shared by antigens and antibodies.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Body orientation in radians. Antigens keep theirs fixed.
    pub angle: f32,
}

impl Particle {
    pub fn new(id: ParticleId, pos: Vec2, vel: Vec2, angle: f32) -> Self {
        Particle { id, pos, vel, angle }
    }
}

/// A binding site on an antigen surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Epitope {
    /// World-frame angle of the site around the antigen center.
    pub angle: f32,
    pub occupant: Option<ParticleId>,
}

impl Epitope {
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Antigen {
    pub body: Particle,
    pub radius: f32,
    pub epitopes: Vec<Epitope>,
    /// Root of the cluster this antigen belongs to. Written only by cluster detection.
    pub cluster: ParticleId,
    /// Written only by cluster detection.
    pub precipitated: bool,
}

impl Antigen {
    pub fn new(id: ParticleId, pos: Vec2, vel: Vec2, radius: f32, epitope_angles: &[f32]) -> Self {
        Antigen {
            body: Particle::new(id, pos, vel, 0.0),
            radius,
            epitopes: epitope_angles
                .iter()
                .map(|&angle| Epitope {
                    angle,
                    occupant: None,
                })
                .collect(),
            cluster: id,
            precipitated: false,
        }
    }

    pub fn occupied_epitopes(&self) -> usize {
        self.epitopes.iter().filter(|e| e.is_occupied()).count()
    }

    /// Slot of antigen `id` in an id-ordered antigen list, if it resolves.
    pub fn slot_in(antigens: &[Antigen], id: ParticleId) -> Option<usize> {
        let slot = id as usize;
        antigens.get(slot).filter(|ag| ag.body.id == id).map(|_| slot)
    }
}

/// A binding appendage of an antibody.
#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    /// Angular offset relative to the antibody body frame.
    pub angle: f32,
    pub target: Option<BindingTarget>,
}

impl Arm {
    pub fn is_bound(&self) -> bool {
        self.target.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Antibody {
    pub body: Particle,
    pub kind: AntibodyType,
    pub stem_length: f32,
    pub arms: Vec<Arm>,
}

impl Antibody {
    pub fn new(id: ParticleId, pos: Vec2, vel: Vec2, angle: f32, kind: AntibodyType) -> Self {
        Antibody {
            body: Particle::new(id, pos, vel, angle),
            kind,
            stem_length: kind.stem_length(),
            arms: kind
                .arm_angles()
                .into_iter()
                .map(|angle| Arm { angle, target: None })
                .collect(),
        }
    }

    pub fn bound_arm_count(&self) -> usize {
        self.arms.iter().filter(|a| a.is_bound()).count()
    }

    /// Distinct antigens held by this antibody, in arm order.
    pub fn bridged_antigens(&self) -> Vec<ParticleId> {
        let mut ids: Vec<ParticleId> = Vec::with_capacity(self.arms.len());
        for target in self.arms.iter().filter_map(|a| a.target) {
            if !ids.contains(&target.antigen) {
                ids.push(target.antigen);
            }
        }
        ids
    }

    pub fn is_bridge(&self) -> bool {
        self.bridged_antigens().len() >= 2
    }
}

/// Arena owning every entity of one population.
///
/// Antigens occupy ids `0..antigens.len()` and antibodies follow, so an id
/// resolves to its slot by offset. Lookups verify the stored id and return
/// `None` for anything that does not resolve.
#[derive(Debug, Clone, Default)]
pub struct SimState {
    pub antigens: Vec<Antigen>,
    pub antibodies: Vec<Antibody>,
}

impl SimState {
    pub fn new(antigens: Vec<Antigen>, antibodies: Vec<Antibody>) -> Self {
        SimState {
            antigens,
            antibodies,
        }
    }

    pub fn particle_count(&self) -> usize {
        self.antigens.len() + self.antibodies.len()
    }

    pub fn total_epitopes(&self) -> usize {
        self.antigens.iter().map(|ag| ag.epitopes.len()).sum()
    }

    pub fn antigen_slot(&self, id: ParticleId) -> Option<usize> {
        Antigen::slot_in(&self.antigens, id)
    }

    pub fn antibody_slot(&self, id: ParticleId) -> Option<usize> {
        let slot = (id as usize).checked_sub(self.antigens.len())?;
        self.antibodies
            .get(slot)
            .filter(|ab| ab.body.id == id)
            .map(|_| slot)
    }

    pub fn antigen(&self, id: ParticleId) -> Option<&Antigen> {
        let slot = self.antigen_slot(id)?;
        self.antigens.get(slot)
    }

    pub fn antigen_mut(&mut self, id: ParticleId) -> Option<&mut Antigen> {
        let slot = self.antigen_slot(id)?;
        self.antigens.get_mut(slot)
    }

    /// Iterates over every particle body, antigens first.
    pub fn bodies(&self) -> impl Iterator<Item = &Particle> {
        self.antigens
            .iter()
            .map(|ag| &ag.body)
            .chain(self.antibodies.iter().map(|ab| &ab.body))
    }

    pub fn bodies_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.antigens
            .iter_mut()
            .map(|ag| &mut ag.body)
            .chain(self.antibodies.iter_mut().map(|ab| &mut ab.body))
    }

    /// Attaches arm `arm` of the antibody in `antibody_slot` to `target`,
    /// updating both sides. Returns false and changes nothing if the arm is
    /// already bound, the epitope is occupied, or either side does not resolve.
    pub fn bind(&mut self, antibody_slot: usize, arm: usize, target: BindingTarget) -> bool {
        let Some(antibody) = self.antibodies.get(antibody_slot) else {
            return false;
        };
        let antibody_id = antibody.body.id;
        match antibody.arms.get(arm) {
            Some(a) if !a.is_bound() => {}
            _ => return false,
        }
        let Some(antigen) = self.antigen_mut(target.antigen) else {
            return false;
        };
        let Some(epitope) = antigen.epitopes.get_mut(target.epitope) else {
            return false;
        };
        if epitope.is_occupied() {
            return false;
        }
        epitope.occupant = Some(antibody_id);
        self.antibodies[antibody_slot].arms[arm].target = Some(target);
        true
    }

    /// Releases arm `arm` of the antibody in `antibody_slot`, clearing the
    /// epitope it held. Returns false if the arm was not bound.
    pub fn unbind(&mut self, antibody_slot: usize, arm: usize) -> bool {
        let Some(target) = self
            .antibodies
            .get_mut(antibody_slot)
            .and_then(|ab| ab.arms.get_mut(arm))
            .and_then(|a| a.target.take())
        else {
            return false;
        };
        if let Some(epitope) = self
            .antigen_mut(target.antigen)
            .and_then(|ag| ag.epitopes.get_mut(target.epitope))
        {
            epitope.occupant = None;
        } else {
            log::debug!(
                "Released arm {} of antibody slot {} pointed at missing antigen {} epitope {}.",
                arm,
                antibody_slot,
                target.antigen,
                target.epitope
            );
        }
        true
    }

    /// Checks that the arm and epitope sides of every binding agree.
    pub fn verify_bindings(&self) -> Result<()> {
        let mut bound_arms = 0usize;
        for antibody in &self.antibodies {
            for (arm_idx, arm) in antibody.arms.iter().enumerate() {
                let Some(target) = arm.target else { continue };
                bound_arms += 1;
                let epitope = self
                    .antigen(target.antigen)
                    .and_then(|ag| ag.epitopes.get(target.epitope))
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "antibody {} arm {} targets missing antigen {} epitope {}",
                            antibody.body.id,
                            arm_idx,
                            target.antigen,
                            target.epitope
                        )
                    })?;
                if epitope.occupant != Some(antibody.body.id) {
                    anyhow::bail!(
                        "antibody {} arm {} targets antigen {} epitope {} held by {:?}",
                        antibody.body.id,
                        arm_idx,
                        target.antigen,
                        target.epitope,
                        epitope.occupant
                    );
                }
            }
        }

        let occupied: usize = self.antigens.iter().map(|ag| ag.occupied_epitopes()).sum();
        if occupied != bound_arms {
            anyhow::bail!(
                "{} occupied epitopes but {} bound arms",
                occupied,
                bound_arms
            );
        }
        Ok(())
    }
}
