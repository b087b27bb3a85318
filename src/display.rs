use std::io::{self, Write};

use crate::{constants::UNK_TOKEN, vocab::Vocab};

/// Renders one index sequence as space-joined words, stopping at the first
/// `<eos>` or padding index. With `right_aligned`, leading padding is skipped
/// instead of ending the sentence.
pub fn format_sentence(sentence: &[i64], vocab: &Vocab, right_aligned: bool) -> String {
    let mut started = !right_aligned;
    let mut words = Vec::with_capacity(sentence.len());
    for &index in sentence {
        if index == vocab.pad_index() || index == vocab.eos_index() {
            if started {
                break;
            }
        } else {
            started = true;
            words.push(vocab.token(index).unwrap_or(UNK_TOKEN));
        }
    }
    words.join(" ")
}

pub fn format_sentences<I, S>(output: I, vocab: &Vocab, right_aligned: bool) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[i64]>,
{
    output
        .into_iter()
        .map(|sentence| format_sentence(sentence.as_ref(), vocab, right_aligned))
        .collect()
}

/// Writes `Sentence i: ...` for every sequence, followed by a blank line.
pub fn display_sentences<W, I, S>(
    out: &mut W,
    output: I,
    vocab: &Vocab,
    right_aligned: bool,
) -> io::Result<()>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<[i64]>,
{
    for (i, text) in format_sentences(output, vocab, right_aligned)
        .iter()
        .enumerate()
    {
        writeln!(out, "Sentence {i}: {text}")?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Alignment, SentenceBatch};

    fn vocab() -> Vocab {
        Vocab::from_tokens(["the", "cat", "sat"])
    }

    #[test]
    fn test_stops_at_eos() {
        let vocab = vocab();
        assert_eq!(format_sentence(&[3, 4, 2, 5], &vocab, false), "the cat");
        assert_eq!(format_sentence(&[3, 4, 5], &vocab, false), "the cat sat");
        assert_eq!(format_sentence(&[2, 3], &vocab, false), "");
    }

    #[test]
    fn test_stops_at_padding() {
        let vocab = vocab();
        assert_eq!(format_sentence(&[3, 0, 4], &vocab, false), "the");
        assert_eq!(format_sentence(&[0, 0, 3, 4], &vocab, false), "");
    }

    #[test]
    fn test_right_aligned_skips_leading_padding() {
        let vocab = vocab();
        assert_eq!(format_sentence(&[0, 0, 3, 4, 5], &vocab, true), "the cat sat");
        assert_eq!(format_sentence(&[0, 2, 3, 4, 2, 5], &vocab, true), "the cat");
        assert_eq!(format_sentence(&[0, 0, 0], &vocab, true), "");
    }

    #[test]
    fn test_unknown_index_renders_unk() {
        let vocab = vocab();
        assert_eq!(format_sentence(&[3, 1, 99], &vocab, false), "the <unk> <unk>");
    }

    #[test]
    fn test_display_batch() -> anyhow::Result<()> {
        let vocab = vocab();
        let batch = SentenceBatch::from_sentences(
            &[vec![3, 4, 5, 2], vec![5, 2]],
            Alignment::Right,
            vocab.pad_index(),
        );
        let mut out = Vec::new();
        display_sentences(&mut out, batch.rows(), &vocab, true)?;
        assert_eq!(
            String::from_utf8(out)?,
            "Sentence 0: the cat sat\nSentence 1: sat\n\n"
        );
        Ok(())
    }
}
