//! Regular grids of vector-valued samples.
use nalgebra::{DVector, RealField};

use crate::error::{InverseError, Result};

/// Samples of a `components`-vector on a regular grid of the given shape.
///
/// The first axis varies fastest and the components of one node are stored
/// contiguously.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<F> {
    shape: Vec<usize>,
    components: usize,
    data: Vec<F>,
}

impl<F: RealField + Copy> Grid<F> {
    pub fn new(shape: Vec<usize>, components: usize, data: Vec<F>) -> Result<Self> {
        let nodes: usize = shape.iter().product();
        InverseError::check_len(nodes * components, data.len())?;
        Ok(Self {
            shape,
            components,
            data,
        })
    }

    /// Fill the grid by evaluating `f` at every node index.
    pub fn from_fn<G>(shape: Vec<usize>, components: usize, mut f: G) -> Result<Self>
    where
        G: FnMut(&[usize]) -> DVector<F>,
    {
        let mut data = Vec::with_capacity(shape.iter().product::<usize>() * components);
        for index in Odometer::new(&shape) {
            let value = f(&index);
            InverseError::check_len(components, value.len())?;
            data.extend(value.iter().copied());
        }
        Self::new(shape, components, data)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// The node at `index`, or `None` outside the grid.
    pub fn get(&self, index: &[isize]) -> Option<&[F]> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        let mut stride = 1;
        for (&i, &size) in index.iter().zip(self.shape.iter()) {
            if i < 0 || i as usize >= size {
                return None;
            }
            offset += i as usize * stride;
            stride *= size;
        }
        let start = offset * self.components;
        Some(&self.data[start..start + self.components])
    }
}

/// Iterates all indices in `$[0, e_0)\times\cdots\times[0, e_{n-1})$`, first axis fastest.
#[derive(Clone, Debug)]
pub(crate) struct Odometer {
    extent: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl Odometer {
    pub(crate) fn new(extent: &[usize]) -> Self {
        let next = if extent.iter().all(|&e| e > 0) {
            Some(vec![0; extent.len()])
        } else {
            None
        };
        Self {
            extent: extent.to_vec(),
            next,
        }
    }
}

impl Iterator for Odometer {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for (i, digit) in following.iter_mut().enumerate() {
            *digit += 1;
            if *digit < self.extent[i] {
                self.next = Some(following);
                return Some(current);
            }
            *digit = 0;
        }
        Some(current)
    }
}
