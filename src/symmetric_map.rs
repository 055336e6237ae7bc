use fnv::FnvHashMap;

/// Map keyed by an unordered pair of indices.
#[derive(Clone, Debug, Default)]
pub struct SymmetricMap<T> {
    map: FnvHashMap<(usize, usize), T>,
}

impl<T> SymmetricMap<T> {
    pub fn new() -> Self {
        SymmetricMap {
            map: FnvHashMap::default(),
        }
    }

    fn order_indices(i1: usize, i2: usize) -> (usize, usize) {
        if i1 > i2 {
            (i2, i1)
        } else {
            (i1, i2)
        }
    }

    pub fn get(&self, i1: usize, i2: usize) -> Option<&T> {
        self.map.get(&Self::order_indices(i1, i2))
    }

    pub fn contains(&self, i1: usize, i2: usize) -> bool {
        self.map.contains_key(&Self::order_indices(i1, i2))
    }

    pub fn insert(&mut self, i1: usize, i2: usize, value: T) {
        self.map.insert(Self::order_indices(i1, i2), value);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Pairs come out with the smaller index first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        self.map.iter().map(|((i1, i2), v)| (*i1, *i2, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_does_not_matter() {
        let mut links = SymmetricMap::new();
        links.insert(4, 1, "a");

        assert_eq!(links.get(1, 4), Some(&"a"));
        assert!(links.contains(4, 1));
        assert_eq!(links.iter().next(), Some((1, 4, &"a")));
    }
}
