/// Literal for the unknown token. Raw input tokens equal to it skip normalization.
pub const UNK_TOKEN: &str = "<unk>";
/// Literal for the end-of-sequence token.
pub const EOS_TOKEN: &str = "<eos>";
/// Literal for the padding token.
pub const PAD_TOKEN: &str = "<pad>";

/// Reserved vocabulary index for padding. Empty batch positions hold this value.
pub const PAD_INDEX: i64 = 0;
/// Reserved vocabulary index for unknown words.
pub const UNK_INDEX: i64 = 1;
/// Reserved vocabulary index for end-of-sequence.
pub const EOS_INDEX: i64 = 2;

/// Every maximal run of digits in a word collapses to this symbol.
pub const NUM_PLACEHOLDER: char = '#';

/// The fraction of the corpus files used for training; the rest is used for validation.
pub const TRAIN_VALIDATION_SPLIT: f64 = 0.9;
