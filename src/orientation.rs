use crate::enums::Orientation;

pub struct OrientationResolver;

impl OrientationResolver {
    /// Derive the slice plane from the six ImageOrientationPatient
    /// direction cosines (row vector followed by column vector).
    ///
    /// The dominant component of the slice normal decides the plane:
    /// x → Sagittal, y → Coronal, z → Axial. Anything that is not six
    /// finite values spanning a plane yields [`Orientation::Unknown`].
    pub fn from_direction_cosines(cosines: Option<&[f64]>) -> Orientation {
        let Some(&[rx, ry, rz, cx, cy, cz]) = cosines else {
            return Orientation::Unknown;
        };

        let normal = [ry * cz - rz * cy, rz * cx - rx * cz, rx * cy - ry * cx];
        if normal.iter().any(|c| !c.is_finite()) {
            return Orientation::Unknown;
        }

        let (axis, magnitude) = normal
            .iter()
            .map(|c| c.abs())
            .enumerate()
            .fold((0, 0.0), |best, (i, m)| if m > best.1 { (i, m) } else { best });

        if magnitude == 0.0 {
            return Orientation::Unknown;
        }

        match axis {
            0 => Orientation::Sagittal,
            1 => Orientation::Coronal,
            _ => Orientation::Axial,
        }
    }
}
