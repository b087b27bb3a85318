use std::ops::Range;

use tch::{Device, Tensor};

use crate::error::{Error, Result};

/// Which side of a row holds the tokens; the other side is padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// A padded `[batch_size, max_length]` block of token indices plus the valid
/// length of every row, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceBatch {
    tokens: Vec<i64>,
    lengths: Vec<usize>,
    max_length: usize,
    alignment: Alignment,
}

impl SentenceBatch {
    /// Pads `sentences` to the longest one with `pad_index`.
    pub fn from_sentences<S: AsRef<[i64]>>(
        sentences: &[S],
        alignment: Alignment,
        pad_index: i64,
    ) -> Self {
        let max_length = sentences
            .iter()
            .map(|s| s.as_ref().len())
            .max()
            .unwrap_or(0);
        let mut tokens = vec![pad_index; sentences.len() * max_length];
        let mut lengths = Vec::with_capacity(sentences.len());
        for (row, sentence) in tokens.chunks_mut(max_length.max(1)).zip(sentences) {
            let sentence = sentence.as_ref();
            let offset = match alignment {
                Alignment::Left => 0,
                Alignment::Right => max_length - sentence.len(),
            };
            row[offset..offset + sentence.len()].copy_from_slice(sentence);
            lengths.push(sentence.len());
        }
        // chunks_mut yields nothing for an empty buffer, so zero-width
        // batches still need their (all zero) lengths.
        lengths.resize(sentences.len(), 0);
        SentenceBatch {
            tokens,
            lengths,
            max_length,
            alignment,
        }
    }

    /// Wraps a caller-built buffer. Only the overall shape is checked here;
    /// each consumer checks `lengths` against `max_length` itself.
    pub fn from_parts(
        tokens: Vec<i64>,
        lengths: Vec<usize>,
        max_length: usize,
        alignment: Alignment,
    ) -> Result<Self> {
        if tokens.len() != lengths.len() * max_length {
            return Err(Error::ShapeMismatch(format!(
                "{} tokens cannot form {} rows of width {}",
                tokens.len(),
                lengths.len(),
                max_length
            )));
        }
        Ok(SentenceBatch {
            tokens,
            lengths,
            max_length,
            alignment,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.lengths.len()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.batch_size(), self.max_length)
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn tokens(&self) -> &[i64] {
        &self.tokens
    }

    pub(crate) fn tokens_mut(&mut self) -> &mut [i64] {
        &mut self.tokens
    }

    pub fn row(&self, i: usize) -> &[i64] {
        &self.tokens[i * self.max_length..(i + 1) * self.max_length]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[i64]> + '_ {
        (0..self.batch_size()).map(|i| self.row(i))
    }

    /// Column range holding the tokens of row `i`.
    pub fn valid_span(&self, i: usize) -> Result<Range<usize>> {
        let length = self.lengths[i];
        if length > self.max_length {
            return Err(Error::LengthOutOfBounds {
                row: i,
                length,
                width: self.max_length,
            });
        }
        Ok(match self.alignment {
            Alignment::Left => 0..length,
            Alignment::Right => self.max_length - length..self.max_length,
        })
    }

    /// `[batch_size, max_length]` Int64 tensor on `device`.
    pub fn to_tensor(&self, device: Device) -> Tensor {
        Tensor::from_slice(&self.tokens)
            .view([self.batch_size() as i64, self.max_length as i64])
            .to_device(device)
    }

    /// `[batch_size]` Int64 tensor of row lengths on `device`.
    pub fn lengths_tensor(&self, device: Device) -> Tensor {
        let lengths: Vec<i64> = self.lengths.iter().map(|&l| l as i64).collect();
        Tensor::from_slice(&lengths).to_device(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Kind;

    #[test]
    fn test_left_aligned() {
        let batch = SentenceBatch::from_sentences(&[vec![5, 6, 2], vec![7, 2]], Alignment::Left, 0);
        assert_eq!(batch.shape(), (2, 3));
        assert_eq!(batch.row(0), &[5, 6, 2]);
        assert_eq!(batch.row(1), &[7, 2, 0]);
        assert_eq!(batch.lengths(), &[3, 2]);
        assert_eq!(batch.valid_span(1).unwrap(), 0..2);
    }

    #[test]
    fn test_right_aligned() {
        let batch =
            SentenceBatch::from_sentences(&[vec![5, 6, 2], vec![7, 2]], Alignment::Right, 0);
        assert_eq!(batch.row(1), &[0, 7, 2]);
        assert_eq!(batch.valid_span(1).unwrap(), 1..3);
    }

    #[test]
    fn test_empty_rows() {
        let batch = SentenceBatch::from_sentences(&[vec![4, 2], vec![]], Alignment::Left, 0);
        assert_eq!(batch.row(1), &[0, 0]);
        assert_eq!(batch.lengths(), &[2, 0]);

        let empty = SentenceBatch::from_sentences(&vec![Vec::<i64>::new(); 3], Alignment::Left, 0);
        assert_eq!(empty.shape(), (3, 0));
        assert_eq!(empty.lengths(), &[0, 0, 0]);
    }

    #[test]
    fn test_from_parts_checks_shape() {
        assert!(SentenceBatch::from_parts(vec![1, 2, 3], vec![1, 1], 2, Alignment::Left).is_err());
        let batch = SentenceBatch::from_parts(vec![1, 2, 3, 4], vec![2, 5], 2, Alignment::Left)
            .unwrap();
        assert!(matches!(
            batch.valid_span(1),
            Err(Error::LengthOutOfBounds { row: 1, length: 5, width: 2 })
        ));
    }

    #[test]
    fn test_to_tensor() {
        let batch = SentenceBatch::from_sentences(&[vec![5, 6, 2], vec![7, 2]], Alignment::Left, 0);
        let tensor = batch.to_tensor(Device::Cpu);
        assert_eq!(tensor.size(), &[2, 3]);
        assert_eq!(tensor.kind(), Kind::Int64);
        assert_eq!(i64::try_from(&tensor.get(1).get(0)).unwrap(), 7);
        let lengths = batch.lengths_tensor(Device::Cpu);
        assert_eq!(lengths.size(), &[2]);
        assert_eq!(i64::try_from(&lengths.get(0)).unwrap(), 3);
    }
}
