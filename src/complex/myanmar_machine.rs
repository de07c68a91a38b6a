// Syllable scanner for Myanmar.
//
// A table-driven DFA over the categories assigned by `myanmar::get_category`,
// matching the longest syllable at each position:
//
//   k  = Ra As H
//   c  = C | Ra
//   j  = ZWJ | ZWNJ
//   medial_group          = MY? As? MR? ((MW MH? | MH) As?)?
//   main_vowel_group      = (VPre VS?)* VAbv* VBlw* A* (DB As?)?
//   post_vowel_group      = VPst MH? As* VAbv* A* (DB As?)?
//   pwo_tone_group        = PT A* DB? As?
//   complex_syllable_tail = As* medial_group main_vowel_group post_vowel_group*
//                           pwo_tone_group* SM* j?
//   syllable_tail         = (H (c | IV) VS?)* (H | complex_syllable_tail)
//   consonant_syllable    = k? (c | IV | D | GB) VS? syllable_tail
//   punctuation_cluster   = P SM
//   broken_cluster        = k? VS? syllable_tail
//
// Every glyph is read once, plus one re-read when a syllable ends on a
// lookahead, so a scan takes at most `2 * len + 1` transitions.

use crate::buffer::Buffer;

static ACTIONS: [i8; 23] = [
    0, 1, 0, 1, 1, 1, 2, 1, 3, 1, 4, 1, 5, 1, 6, 1, 7, 1, 8, 1, 9, 0, 0,
];
static KEY_OFFSETS: [i16; 54] = [
    0, 24, 41, 47, 50, 55, 62, 67, 71, 81, 88, 97, 105, 108, 123, 134, 144, 153, 161, 172, 184,
    196, 210, 223, 239, 245, 248, 253, 260, 265, 269, 279, 286, 295, 303, 306, 323, 338, 349, 359,
    368, 376, 387, 399, 411, 425, 438, 454, 471, 487, 509, 514, 0, 0,
];
static TRANS_KEYS: [u8; 517] = [
    3, 4, 8, 10, 11, 16, 18, 19, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 1, 2, 5, 6, 3, 4,
    8, 10, 18, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 5, 6, 8, 18, 25, 29, 5, 6, 8, 5, 6, 8, 25,
    29, 5, 6, 3, 8, 10, 18, 25, 5, 6, 8, 18, 25, 5, 6, 8, 25, 5, 6, 3, 8, 10, 18, 21, 25, 26, 29,
    5, 6, 3, 8, 10, 25, 29, 5, 6, 3, 8, 10, 18, 25, 26, 29, 5, 6, 3, 8, 10, 25, 26, 29, 5, 6, 16,
    1, 2, 3, 8, 10, 18, 21, 22, 23, 24, 25, 26, 27, 28, 29, 5, 6, 3, 8, 10, 18, 25, 26, 27, 28, 29,
    5, 6, 3, 8, 10, 25, 26, 27, 28, 29, 5, 6, 3, 8, 10, 25, 26, 27, 29, 5, 6, 3, 8, 10, 25, 27, 29,
    5, 6, 3, 8, 10, 25, 26, 27, 28, 29, 30, 5, 6, 3, 8, 10, 21, 23, 25, 26, 27, 28, 29, 5, 6, 3, 8,
    10, 18, 21, 25, 26, 27, 28, 29, 5, 6, 3, 8, 10, 18, 21, 22, 23, 25, 26, 27, 28, 29, 5, 6, 3, 8,
    10, 21, 22, 23, 25, 26, 27, 28, 29, 5, 6, 3, 4, 8, 10, 18, 21, 22, 23, 24, 25, 26, 27, 28, 29,
    5, 6, 8, 18, 25, 29, 5, 6, 8, 5, 6, 8, 25, 29, 5, 6, 3, 8, 10, 18, 25, 5, 6, 8, 18, 25, 5, 6,
    8, 25, 5, 6, 3, 8, 10, 18, 21, 25, 26, 29, 5, 6, 3, 8, 10, 25, 29, 5, 6, 3, 8, 10, 18, 25, 26,
    29, 5, 6, 3, 8, 10, 25, 26, 29, 5, 6, 16, 1, 2, 3, 4, 8, 10, 18, 21, 22, 23, 24, 25, 26, 27,
    28, 29, 30, 5, 6, 3, 8, 10, 18, 21, 22, 23, 24, 25, 26, 27, 28, 29, 5, 6, 3, 8, 10, 18, 25, 26,
    27, 28, 29, 5, 6, 3, 8, 10, 25, 26, 27, 28, 29, 5, 6, 3, 8, 10, 25, 26, 27, 29, 5, 6, 3, 8, 10,
    25, 27, 29, 5, 6, 3, 8, 10, 25, 26, 27, 28, 29, 30, 5, 6, 3, 8, 10, 21, 23, 25, 26, 27, 28, 29,
    5, 6, 3, 8, 10, 18, 21, 25, 26, 27, 28, 29, 5, 6, 3, 8, 10, 18, 21, 22, 23, 25, 26, 27, 28, 29,
    5, 6, 3, 8, 10, 21, 22, 23, 25, 26, 27, 28, 29, 5, 6, 3, 4, 8, 10, 18, 21, 22, 23, 24, 25, 26,
    27, 28, 29, 5, 6, 3, 4, 8, 10, 18, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 5, 6, 3, 4, 8, 10,
    18, 21, 22, 23, 24, 25, 26, 27, 28, 29, 5, 6, 3, 4, 8, 10, 11, 16, 18, 21, 22, 23, 24, 25, 26,
    27, 28, 29, 30, 32, 1, 2, 5, 6, 11, 16, 32, 1, 2, 8, 0, 0,
];
static SINGLE_LENGTHS: [i8; 54] = [
    20, 15, 4, 1, 3, 5, 3, 2, 8, 5, 7, 6, 1, 13, 9, 8, 7, 6, 9, 10, 10, 12, 11, 14, 4, 1, 3, 5, 3,
    2, 8, 5, 7, 6, 1, 15, 13, 9, 8, 7, 6, 9, 10, 10, 12, 11, 14, 15, 14, 18, 3, 1, 0, 0,
];
static RANGE_LENGTHS: [i8; 54] = [
    2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 1, 0, 0, 0,
];
static INDEX_OFFSETS: [i16; 54] = [
    0, 23, 40, 46, 49, 54, 61, 66, 70, 80, 87, 96, 104, 107, 122, 133, 143, 152, 160, 171, 183,
    195, 209, 222, 238, 244, 247, 252, 259, 264, 268, 278, 285, 294, 302, 305, 322, 337, 348, 358,
    367, 375, 386, 398, 410, 424, 437, 453, 470, 486, 507, 512, 0, 0,
];
static COND_TARGS: [i8; 568] = [
    24, 34, 25, 31, 1, 47, 36, 50, 37, 42, 43, 44, 27, 39, 40, 41, 30, 46, 51, 1, 1, 0, 0, 2, 12,
    3, 9, 13, 14, 19, 20, 21, 5, 16, 17, 18, 8, 23, 0, 0, 3, 4, 5, 8, 0, 0, 3, 0, 0, 3, 5, 8, 0, 0,
    6, 3, 5, 7, 5, 0, 0, 3, 7, 5, 0, 0, 3, 5, 0, 0, 2, 3, 9, 10, 10, 5, 11, 8, 0, 0, 2, 3, 9, 5, 8,
    0, 0, 2, 3, 9, 10, 5, 11, 8, 0, 0, 2, 3, 9, 5, 11, 8, 0, 0, 1, 1, 0, 2, 3, 9, 13, 14, 19, 20,
    21, 5, 16, 17, 18, 8, 0, 0, 2, 3, 9, 15, 5, 16, 17, 18, 8, 0, 0, 2, 3, 9, 5, 16, 17, 18, 8, 0,
    0, 2, 3, 9, 5, 16, 17, 8, 0, 0, 2, 3, 9, 5, 17, 8, 0, 0, 2, 3, 9, 5, 16, 17, 18, 8, 15, 0, 0,
    2, 3, 9, 14, 20, 5, 16, 17, 18, 8, 0, 0, 2, 3, 9, 15, 14, 5, 16, 17, 18, 8, 0, 0, 2, 3, 9, 22,
    14, 19, 20, 5, 16, 17, 18, 8, 0, 0, 2, 3, 9, 14, 19, 20, 5, 16, 17, 18, 8, 0, 0, 2, 12, 3, 9,
    13, 14, 19, 20, 21, 5, 16, 17, 18, 8, 0, 0, 25, 26, 27, 30, 0, 0, 25, 0, 0, 25, 27, 30, 0, 0,
    28, 25, 27, 29, 27, 0, 0, 25, 29, 27, 0, 0, 25, 27, 0, 0, 24, 25, 31, 32, 32, 27, 33, 30, 0, 0,
    24, 25, 31, 27, 30, 0, 0, 24, 25, 31, 32, 27, 33, 30, 0, 0, 24, 25, 31, 27, 33, 30, 0, 0, 35,
    35, 0, 24, 34, 25, 31, 36, 37, 42, 43, 44, 27, 39, 40, 41, 30, 46, 0, 0, 24, 25, 31, 36, 37,
    42, 43, 44, 27, 39, 40, 41, 30, 0, 0, 24, 25, 31, 38, 27, 39, 40, 41, 30, 0, 0, 24, 25, 31, 27,
    39, 40, 41, 30, 0, 0, 24, 25, 31, 27, 39, 40, 30, 0, 0, 24, 25, 31, 27, 40, 30, 0, 0, 24, 25,
    31, 27, 39, 40, 41, 30, 38, 0, 0, 24, 25, 31, 37, 43, 27, 39, 40, 41, 30, 0, 0, 24, 25, 31, 38,
    37, 27, 39, 40, 41, 30, 0, 0, 24, 25, 31, 45, 37, 42, 43, 27, 39, 40, 41, 30, 0, 0, 24, 25, 31,
    37, 42, 43, 27, 39, 40, 41, 30, 0, 0, 24, 34, 25, 31, 36, 37, 42, 43, 44, 27, 39, 40, 41, 30,
    0, 0, 2, 12, 3, 9, 48, 14, 19, 20, 21, 5, 16, 17, 18, 8, 23, 0, 0, 2, 49, 3, 9, 13, 14, 19, 20,
    21, 5, 16, 17, 18, 8, 0, 0, 24, 34, 25, 31, 1, 1, 36, 37, 42, 43, 44, 27, 39, 40, 41, 30, 46,
    1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0,
];
static COND_ACTIONS: [i8; 568] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7, 13, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0, 5, 15, 0, 5, 15, 0, 0, 0, 5, 15, 0, 0, 0, 0, 0, 5, 15,
    0, 0, 0, 5, 15, 0, 0, 5, 15, 0, 0, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0,
    0, 0, 0, 5, 15, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5,
    15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0, 0, 0, 0, 5,
    15, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5,
    15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0, 11,
    17, 0, 11, 17, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 11, 17, 0, 0, 11, 17, 0, 0, 0,
    0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 0,
    11, 17, 0, 0, 17, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 0, 0, 0, 11, 17, 0, 0,
    0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 11, 17, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 11, 17, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 5, 15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 11, 17, 0, 0, 0, 0,
    19, 9, 19, 0, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17,
    17, 17, 15, 15, 17, 19, 19, 0, 0,
];
static TO_STATE_ACTIONS: [i8; 54] = [
    1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];
static FROM_STATE_ACTIONS: [i8; 54] = [
    3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];
static EOF_TRANS: [i16; 54] = [
    515, 516, 517, 518, 519, 520, 521, 522, 523, 524, 525, 526, 527, 528, 529, 530, 531, 532, 533,
    534, 535, 536, 537, 538, 539, 540, 541, 542, 543, 544, 545, 546, 547, 548, 549, 550, 551, 552,
    553, 554, 555, 556, 557, 558, 559, 560, 561, 562, 563, 564, 565, 566, 0, 0,
];

const MACHINE_START: usize = 0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyllableType {
    ConsonantSyllable = 0,
    PunctuationCluster,
    BrokenCluster,
    NonMyanmarCluster,
}

impl SyllableType {
    pub fn from_syllable(syllable: u8) -> Self {
        match syllable & 0x0F {
            0 => SyllableType::ConsonantSyllable,
            1 => SyllableType::PunctuationCluster,
            2 => SyllableType::BrokenCluster,
            _ => SyllableType::NonMyanmarCluster,
        }
    }
}

/// Actions attached to a state or transition, as `(count, id...)` runs
/// starting at `offset`.
fn actions(offset: i8) -> impl Iterator<Item = i8> {
    let offset = offset as usize;
    let count = ACTIONS[offset] as usize;
    ACTIONS[offset + 1..offset + 1 + count].iter().copied()
}

/// The transition taken from state `cs` on category `cat`.
fn transition(cs: usize, cat: u8) -> usize {
    let mut keys = KEY_OFFSETS[cs] as usize;
    let mut trans = INDEX_OFFSETS[cs] as usize;

    let single_len = SINGLE_LENGTHS[cs] as usize;
    let singles = &TRANS_KEYS[keys..keys + single_len];
    if let Ok(i) = singles.binary_search(&cat) {
        return trans + i;
    }
    keys += single_len;
    trans += single_len;

    let range_len = RANGE_LENGTHS[cs] as usize;
    let ranges = &TRANS_KEYS[keys..keys + 2 * range_len];
    match ranges
        .chunks_exact(2)
        .position(|range| range[0] <= cat && cat <= range[1])
    {
        Some(i) => trans + i,
        None => trans + range_len,
    }
}

pub fn find_syllables_myanmar(buffer: &mut Buffer) {
    let len = buffer.len();
    let mut cs = MACHINE_START;
    let mut ts = 0;
    let mut p = 0;
    let mut syllable_serial = 1u8;

    loop {
        if actions(FROM_STATE_ACTIONS[cs]).any(|id| id == 1) {
            ts = p;
        }

        let trans = if p == len {
            match EOF_TRANS[cs] {
                0 => break,
                t => t as usize - 1,
            }
        } else {
            transition(cs, buffer.info[p].complex_category())
        };

        cs = COND_TARGS[trans] as usize;
        if COND_ACTIONS[trans] != 0 {
            for id in actions(COND_ACTIONS[trans]) {
                let (kind, lookahead) = match id {
                    2 => (SyllableType::ConsonantSyllable, false),
                    3 | 6 => (SyllableType::NonMyanmarCluster, false),
                    4 => (SyllableType::PunctuationCluster, false),
                    5 => (SyllableType::BrokenCluster, false),
                    7 => (SyllableType::ConsonantSyllable, true),
                    8 => (SyllableType::BrokenCluster, true),
                    9 => (SyllableType::NonMyanmarCluster, true),
                    _ => continue,
                };

                // A lookahead match ends before `p`, which is read again.
                let te = if lookahead { p } else { p + 1 };
                found_syllable(ts, te, &mut syllable_serial, kind, buffer);
                if lookahead {
                    p -= 1;
                }
            }
        }

        if p == len {
            break;
        }

        if actions(TO_STATE_ACTIONS[cs]).any(|id| id == 0) {
            ts = 0;
        }

        p += 1;
    }
}

#[inline]
fn found_syllable(
    start: usize,
    end: usize,
    syllable_serial: &mut u8,
    kind: SyllableType,
    buffer: &mut Buffer,
) {
    for info in &mut buffer.info[start..end] {
        info.set_syllable((*syllable_serial << 4) | kind as u8);
    }

    *syllable_serial += 1;

    if *syllable_serial == 16 {
        *syllable_serial = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complex::myanmar::category::*;
    use pretty_assertions::assert_eq;

    fn scan(cats: &[u8]) -> Vec<(usize, usize, SyllableType)> {
        let mut buffer = Buffer::new();
        for (i, &cat) in cats.iter().enumerate() {
            buffer.add('\u{1000}', i as u32);
            buffer.info[i].set_complex_category(cat);
        }

        find_syllables_myanmar(&mut buffer);

        let mut out = Vec::new();
        let mut start = 0;
        while start < buffer.len() {
            let end = buffer.next_syllable(start);
            out.push((start, end, SyllableType::from_syllable(buffer.info[start].syllable())));
            start = end;
        }
        out
    }

    #[test]
    fn consonant_with_kinzi_and_vowels() {
        assert_eq!(
            scan(&[RA, AS, H, C, V_BLW]),
            vec![(0, 5, SyllableType::ConsonantSyllable)]
        );
        assert_eq!(
            scan(&[C, MY, MR, MW, MH, V_PRE, V_ABV, V_BLW, A, DB, V_PST, SM]),
            vec![(0, 12, SyllableType::ConsonantSyllable)]
        );
    }

    #[test]
    fn stacked_consonants() {
        assert_eq!(scan(&[C, H, C, V_PST]), vec![(0, 4, SyllableType::ConsonantSyllable)]);
        assert_eq!(
            scan(&[C, V_BLW, C]),
            vec![
                (0, 2, SyllableType::ConsonantSyllable),
                (2, 3, SyllableType::ConsonantSyllable),
            ]
        );
    }

    #[test]
    fn lone_vowel_is_broken() {
        assert_eq!(scan(&[V_BLW]), vec![(0, 1, SyllableType::BrokenCluster)]);
        assert_eq!(scan(&[V_PRE, V_ABV]), vec![(0, 2, SyllableType::BrokenCluster)]);
    }

    #[test]
    fn joiners_punctuation_and_others() {
        assert_eq!(scan(&[ZWJ]), vec![(0, 1, SyllableType::NonMyanmarCluster)]);
        assert_eq!(scan(&[P, SM]), vec![(0, 2, SyllableType::PunctuationCluster)]);
        assert_eq!(
            scan(&[X, X]),
            vec![
                (0, 1, SyllableType::NonMyanmarCluster),
                (1, 2, SyllableType::NonMyanmarCluster),
            ]
        );
    }

    #[test]
    fn long_stacks_are_one_syllable() {
        let mut cats = vec![C];
        for _ in 0..20_000 {
            cats.extend_from_slice(&[H, C]);
        }
        assert_eq!(scan(&cats), vec![(0, 40_001, SyllableType::ConsonantSyllable)]);
    }

    #[test]
    fn lookahead_syllables_at_end_of_buffer() {
        assert_eq!(
            scan(&[C, V_PRE, C, H]),
            vec![
                (0, 2, SyllableType::ConsonantSyllable),
                (2, 4, SyllableType::ConsonantSyllable),
            ]
        );
        assert_eq!(scan(&[]), vec![]);
    }

    #[test]
    fn serials_wrap_around() {
        let mut buffer = Buffer::new();
        for i in 0..20 {
            buffer.add('x', i);
        }
        find_syllables_myanmar(&mut buffer);
        assert_eq!(buffer.info[0].syllable() >> 4, 1);
        assert_eq!(buffer.info[14].syllable() >> 4, 15);
        assert_eq!(buffer.info[15].syllable() >> 4, 1);
    }
}
