//! Planar homography between the image and the floor
//!
//! The matrix is produced once by a calibration step (four clicked floor
//! points and their measured positions in meters) and persisted either as a
//! JSON `[[f64; 3]; 3]` array or as the NumPy `.npy` file written by the
//! calibration script.

use anyhow::{anyhow, bail, Context, Result};
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use ndarray::Array2;
use ndarray_npy::{ReadNpyError, ReadNpyExt};
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// Projections whose homogeneous weight falls below this are treated as
/// points on (or beyond) the horizon line
const MIN_HOMOGENEOUS_WEIGHT: f64 = 1e-12;

/// Relative determinant (against the product of row norms) below which a
/// matrix counts as singular
const MIN_RELATIVE_DETERMINANT: f64 = 1e-12;

/// 3x3 projective transform from pixel to world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    pub fn new(matrix: Matrix3<f64>) -> Result<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            bail!("homography contains non-finite values");
        }
        let row_norms: f64 = matrix.row_iter().map(|row| row.norm()).product();
        if row_norms == 0.0 || matrix.determinant().abs() < row_norms * MIN_RELATIVE_DETERMINANT {
            bail!("homography is singular");
        }
        Ok(Self { matrix })
    }

    /// Create from row-major nested arrays, as stored on disk
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Result<Self> {
        Self::new(Matrix3::from_fn(|r, c| rows[r][c]))
    }

    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Solve the homography mapping four pixel points onto four world points.
    ///
    /// Direct linear transform with `h33` fixed to 1, which fails only for
    /// degenerate layouts (three or more collinear points).
    pub fn from_correspondences(pixels: &[(f64, f64); 4], world: &[(f64, f64); 4]) -> Result<Self> {
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for (i, (&(x, y), &(wx, wy))) in pixels.iter().zip(world.iter()).enumerate() {
            let r = 2 * i;
            // wx * (h31 x + h32 y + 1) = h11 x + h12 y + h13
            a.row_mut(r)
                .copy_from_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -wx * x, -wx * y]);
            b[r] = wx;
            // wy * (h31 x + h32 y + 1) = h21 x + h22 y + h23
            a.row_mut(r + 1)
                .copy_from_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -wy * x, -wy * y]);
            b[r + 1] = wy;
        }

        let singular_values = a.singular_values();
        if singular_values.min() <= singular_values.max() * 1e-12 {
            bail!("degenerate point layout, cannot solve homography");
        }

        let h = a
            .lu()
            .solve(&b)
            .ok_or_else(|| anyhow!("degenerate point layout, cannot solve homography"))?;

        Self::new(Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0))
    }

    /// Load from a `.npy` file or a JSON matrix, chosen by file extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_npy = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("npy"));

        let matrix = if is_npy {
            let file =
                File::open(path).with_context(|| format!("reading {}", path.display()))?;
            read_npy_matrix(BufReader::new(file))
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            let text =
                fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let rows: [[f64; 3]; 3] = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            Matrix3::from_fn(|r, c| rows[r][c])
        };

        Self::new(matrix)
    }

    /// Persist as a JSON row-major matrix
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_rows())?;
        fs::write(path.as_ref(), json)
            .with_context(|| format!("writing {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Apply `[x', y', w'] = H * [x, y, 1]` and dehomogenize
    pub fn project(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let p = self.matrix * Vector3::new(x, y, 1.0);
        if p.z.abs() < MIN_HOMOGENEOUS_WEIGHT || !p.z.is_finite() {
            bail!("pixel ({:.1}, {:.1}) projects onto the horizon", x, y);
        }
        Ok((p.x / p.z, p.y / p.z))
    }
}

/// Read a 3x3 float matrix from NumPy's `.npy` format (`<f8` or `<f4`)
fn read_npy_matrix<R: Read + Seek>(mut reader: R) -> Result<Matrix3<f64>> {
    let array = match Array2::<f64>::read_npy(&mut reader) {
        Ok(array) => array,
        Err(ReadNpyError::WrongDescriptor(_)) => {
            reader.rewind()?;
            Array2::<f32>::read_npy(&mut reader)?.mapv(f64::from)
        }
        Err(e) => return Err(e.into()),
    };

    if array.dim() != (3, 3) {
        bail!("expected a 3x3 matrix, found shape {:?}", array.shape());
    }
    Ok(Matrix3::from_fn(|r, c| array[[r, c]]))
}
