/// Lazily enumerates every index tuple of a Cartesian product, one digit
/// per argument position, first digit fastest.
pub struct ArgProduct {
    radices: Vec<usize>,
    digits: Vec<usize>,
    limit_reached: bool,
}

impl ArgProduct {
    pub fn new(radices: Vec<usize>) -> Self {
        Self {
            limit_reached: radices.iter().any(|x| *x == 0),
            digits: vec![0; radices.len()],
            radices,
        }
    }

    pub fn current(&self) -> Option<&[usize]> {
        if self.limit_reached {
            return None;
        }

        Some(&self.digits)
    }

    pub fn increment(&mut self) {
        if self.limit_reached {
            return;
        }

        // NOTE: this assert failing is 100% a bug
        debug_assert!(self.digits.iter().zip(&self.radices).all(|(d, r)| d < r));

        for (digit, radix) in self.digits.iter_mut().zip(&self.radices) {
            if *digit + 1 < *radix {
                *digit += 1;
                return;
            }

            *digit = 0;
        }

        self.limit_reached = true;
    }
}

/// Index tuples over per-position candidate sizes whose sizes sum to
/// `total`. Only the sizes are looked at, no tree is built.
pub struct SizedProduct<'a> {
    sizes: &'a [Vec<usize>],
    total: usize,
    inner: ArgProduct,
}

impl<'a> SizedProduct<'a> {
    pub fn new(sizes: &'a [Vec<usize>], total: usize) -> Self {
        Self {
            sizes,
            total,
            inner: ArgProduct::new(sizes.iter().map(Vec::len).collect()),
        }
    }
}

impl Iterator for SizedProduct<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        loop {
            let digits = self.inner.current()?;
            let sum = digits.iter()
                .zip(self.sizes)
                .map(|(d, sizes)| sizes[*d])
                .sum::<usize>();
            let res = (sum == self.total).then(|| digits.to_vec());

            self.inner.increment();

            if res.is_some() {
                return res;
            }
        }
    }
}
