/// Groups the items of `iter` into `Vec`s of exactly `n`, padding the last
/// group with clones of `fill`.
///
/// ```
/// use seqvae::grouper::grouper;
/// let groups: Vec<Vec<i32>> = grouper(3, vec![1, 2, 3, 4, 5, 6, 7], 0).collect();
/// assert_eq!(groups, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 0, 0]]);
/// ```
///
/// # Panics
///
/// Panics if `n` is 0.
pub fn grouper<I>(n: usize, iter: I, fill: I::Item) -> Grouper<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Clone,
{
    assert!(n != 0, "group size must be non-zero");
    Grouper {
        iter: iter.into_iter(),
        size: n,
        fill,
    }
}

/// Adapter form of [`grouper`].
pub trait GroupExt: Iterator + Sized {
    fn grouper(self, n: usize, fill: Self::Item) -> Grouper<Self>
    where
        Self::Item: Clone,
    {
        grouper(n, self, fill)
    }
}

impl<I: Iterator> GroupExt for I {}

/// Lazy fixed-size grouping iterator. Pulls at most `n` items per call.
#[derive(Debug, Clone)]
pub struct Grouper<I: Iterator> {
    iter: I,
    size: usize,
    fill: I::Item,
}

impl<I> Iterator for Grouper<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.iter.next()?;
        let mut group = Vec::with_capacity(self.size);
        group.push(first);
        group.extend(self.iter.by_ref().take(self.size - 1));
        group.resize(self.size, self.fill.clone());
        Some(group)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.iter.size_hint();
        (
            lower.div_ceil(self.size),
            upper.map(|upper| upper.div_ceil(self.size)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouper_pads_last_group() {
        let groups: Vec<_> = grouper(3, [1, 2, 3, 4, 5, 6, 7], 0).collect();
        assert_eq!(groups, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 0, 0]]);
    }

    #[test]
    fn test_grouper_exact_multiple() {
        let groups: Vec<_> = (1..=6).grouper(2, 0).collect();
        assert_eq!(groups, vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
    }

    #[test]
    fn test_grouper_empty_input() {
        let mut groups = grouper(4, Vec::<String>::new(), String::new());
        assert!(groups.next().is_none());
    }

    #[test]
    fn test_grouper_option_fill() {
        let groups: Vec<_> = grouper(2, [Some('a'), Some('b'), Some('c')], None).collect();
        assert_eq!(groups, vec![vec![Some('a'), Some('b')], vec![Some('c'), None]]);
    }

    #[test]
    fn test_grouper_is_lazy_over_infinite_input() {
        let mut groups = (0..).grouper(3, -1);
        assert_eq!(groups.next(), Some(vec![0, 1, 2]));
        assert_eq!(groups.next(), Some(vec![3, 4, 5]));
    }

    #[test]
    fn test_grouper_size_hint() {
        let groups = grouper(3, 0..7, 0);
        assert_eq!(groups.size_hint(), (3, Some(3)));
    }

    #[test]
    #[should_panic]
    fn test_grouper_zero_size() {
        let _ = grouper(0, [1], 0);
    }
}
