//! Variable-length record tails.
//!
//! A tail is a packed array of fixed-size elements stored after a record's
//! fixed fields. The record refers to each tail with a [`Span`]: an offset
//! relative to the record start plus an element count. Nothing in a record
//! ever holds an address, so a buffer can be moved or copied freely.
//!
//! On the dispatch side a span resolves to a [`TailArray`], a typed view over
//! the buffer bytes that decodes elements on access.

use std::fmt;
use std::marker::PhantomData;

use bytes::{Buf, BufMut};

use super::wire_format::{align_up, TAIL_ALIGN};

/// Encoded size of a [`Span`].
pub const SPAN_SIZE: usize = 8;

/// A fixed-size element that can live in a record tail.
pub trait Element: Copy + 'static {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Append the encoded element.
    fn put(&self, dst: &mut impl BufMut);

    /// Decode one element from exactly `SIZE` bytes.
    fn get(src: &[u8]) -> Self;
}

impl Element for u8 {
    const SIZE: usize = 1;

    fn put(&self, dst: &mut impl BufMut) {
        dst.put_u8(*self);
    }

    fn get(src: &[u8]) -> Self {
        src[0]
    }
}

impl Element for u16 {
    const SIZE: usize = 2;

    fn put(&self, dst: &mut impl BufMut) {
        dst.put_u16_le(*self);
    }

    fn get(mut src: &[u8]) -> Self {
        src.get_u16_le()
    }
}

impl<const N: usize> Element for [f32; N] {
    const SIZE: usize = 4 * N;

    fn put(&self, dst: &mut impl BufMut) {
        for v in self {
            dst.put_f32_le(*v);
        }
    }

    fn get(mut src: &[u8]) -> Self {
        let mut out = [0.0; N];
        for v in out.iter_mut() {
            *v = src.get_f32_le();
        }
        out
    }
}

impl Element for [u8; 4] {
    const SIZE: usize = 4;

    fn put(&self, dst: &mut impl BufMut) {
        dst.put_slice(self);
    }

    fn get(src: &[u8]) -> Self {
        [src[0], src[1], src[2], src[3]]
    }
}

/// Location of a tail inside its record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    /// Byte offset from the record start.
    pub offset: u32,
    /// Number of elements (0 = tail absent).
    pub count: u32,
}

impl Span {
    /// Span of an absent tail.
    pub const EMPTY: Span = Span { offset: 0, count: 0 };

    /// Padded byte size of a tail holding `count` elements of `T`.
    #[inline]
    pub const fn padded_len<T: Element>(count: usize) -> usize {
        align_up(count * T::SIZE, TAIL_ALIGN)
    }

    pub(crate) fn put(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.offset);
        dst.put_u32_le(self.count);
    }

    pub(crate) fn get(src: &mut &[u8]) -> Self {
        Self {
            offset: src.get_u32_le(),
            count: src.get_u32_le(),
        }
    }

    /// Resolve against the record bytes.
    ///
    /// Returns `Ok(None)` for an absent tail and `Err(())` if the span points
    /// outside the record or into its fixed fields.
    pub(crate) fn resolve<'a, T: Element>(
        &self,
        record: &'a [u8],
        fixed_len: usize,
    ) -> Result<Option<TailArray<'a, T>>, ()> {
        if self.count == 0 {
            return Ok(None);
        }
        let start = self.offset as usize;
        let len = (self.count as usize).checked_mul(T::SIZE).ok_or(())?;
        let end = start.checked_add(len).ok_or(())?;
        if start < fixed_len || end > record.len() {
            return Err(());
        }
        Ok(Some(TailArray::new(&record[start..end])))
    }
}

/// Typed read-only view over a tail stored in a command buffer.
///
/// Elements are decoded on access, so the view works at any byte alignment.
#[derive(Clone, Copy)]
pub struct TailArray<'a, T: Element> {
    bytes: &'a [u8],
    _marker: PhantomData<T>,
}

impl<'a, T: Element> TailArray<'a, T> {
    fn new(bytes: &'a [u8]) -> Self {
        debug_assert_eq!(bytes.len() % T::SIZE, 0);
        Self {
            bytes,
            _marker: PhantomData,
        }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / T::SIZE
    }

    /// Whether the view has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the element at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        let start = index.checked_mul(T::SIZE)?;
        let end = start.checked_add(T::SIZE)?;
        self.bytes.get(start..end).map(T::get)
    }

    /// Iterate over decoded elements.
    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        self.bytes.chunks_exact(T::SIZE).map(T::get)
    }

    /// The raw in-buffer bytes backing this view.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Copy the elements out into an owned vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for TailArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Write `items` as a tail at the end of `buf`, padded to [`TAIL_ALIGN`].
///
/// `record_start` is the offset of the owning record inside `buf`; the
/// returned span is relative to it.
pub(crate) fn put_tail<T: Element>(
    buf: &mut bytes::BytesMut,
    record_start: usize,
    items: Option<&[T]>,
) -> Span {
    let Some(items) = items.filter(|items| !items.is_empty()) else {
        return Span::EMPTY;
    };
    let offset = buf.len() - record_start;
    for item in items {
        item.put(buf);
    }
    let raw = items.len() * T::SIZE;
    buf.put_bytes(0, Span::padded_len::<T>(items.len()) - raw);
    Span {
        offset: offset as u32,
        count: items.len() as u32,
    }
}
