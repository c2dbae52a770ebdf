//! Boolean masks aligned to a raster grid

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, GridSpec, Raster, RasterElement};
use ndarray::{Array2, ArrayView2, Zip};

/// A 2D true/false grid carrying the georeference of the raster it was
/// derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array2<bool>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl Mask {
    /// All-false mask over a reference grid
    pub fn empty(grid: &GridSpec) -> Self {
        Self {
            data: Array2::from_elem(grid.shape(), false),
            transform: grid.transform,
            crs: grid.crs.clone(),
        }
    }

    /// Wrap an existing boolean array with a georeference
    pub fn from_array(data: Array2<bool>, transform: GeoTransform, crs: Option<CRS>) -> Self {
        Self {
            data,
            transform,
            crs,
        }
    }

    /// Mask of the non-zero, valid cells of a raster
    pub fn from_raster<T: RasterElement>(raster: &Raster<T>) -> Self {
        let data = raster
            .data()
            .mapv(|v| !raster.is_nodata(v) && v != T::zero());
        Self {
            data,
            transform: *raster.transform(),
            crs: raster.crs().cloned(),
        }
    }

    /// Encode as a single-band `u8` raster with values in {0, 1}
    pub fn to_raster(&self) -> Raster<u8> {
        Raster::from_array(self.data.mapv(u8::from)).with_geo(self.transform, self.crs.clone())
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Shape, transform and CRS of this mask
    pub fn grid_spec(&self) -> GridSpec {
        GridSpec::new(self.rows(), self.cols(), self.transform, self.crs.clone())
    }

    pub fn view(&self) -> ArrayView2<'_, bool> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<bool> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<bool> {
        &mut self.data
    }

    /// Value at (row, col); out-of-grid cells read as false
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data.get((row, col)).copied().unwrap_or(false)
    }

    /// Number of true cells
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Whether no cell is set
    pub fn is_clear(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    fn check_shape(&self, other: &Mask) -> Result<()> {
        let (er, ec) = self.shape();
        let (ar, ac) = other.shape();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }

    /// Cell-wise logical AND
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        self.check_shape(other)?;
        let data = Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|&a, &b| a && b);
        Ok(Mask {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
        })
    }

    /// Number of cells set in both masks
    pub fn intersection_count(&self, other: &Mask) -> Result<usize> {
        self.check_shape(other)?;
        Ok(Zip::from(&self.data)
            .and(&other.data)
            .fold(0, |acc, &a, &b| acc + usize::from(a && b)))
    }

    /// Number of cells set in either mask
    pub fn union_count(&self, other: &Mask) -> Result<usize> {
        self.check_shape(other)?;
        Ok(Zip::from(&self.data)
            .and(&other.data)
            .fold(0, |acc, &a, &b| acc + usize::from(a || b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn mask(data: Array2<bool>) -> Mask {
        Mask::from_array(data, GeoTransform::default(), None)
    }

    #[test]
    fn test_from_raster_nonzero() {
        let mut raster: Raster<u8> = Raster::new(2, 2);
        raster.set(0, 1, 255).unwrap();
        raster.set(1, 1, 7).unwrap();
        raster.set_nodata(Some(7));
        let m = Mask::from_raster(&raster);
        assert_eq!(m.data(), &array![[false, true], [false, false]]);
    }

    #[test]
    fn test_boolean_ops() {
        let a = mask(array![[true, true], [false, false]]);
        let b = mask(array![[true, false], [true, false]]);
        assert_eq!(a.and(&b).unwrap().count(), 1);
        assert_eq!(a.intersection_count(&b).unwrap(), 1);
        assert_eq!(a.union_count(&b).unwrap(), 3);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = mask(Array2::from_elem((2, 2), false));
        let b = mask(Array2::from_elem((3, 2), false));
        assert!(matches!(a.and(&b), Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn test_to_raster_values() {
        let m = mask(array![[true, false]]);
        let r = m.to_raster();
        assert_eq!(r.data(), &array![[1u8, 0u8]]);
    }
}
