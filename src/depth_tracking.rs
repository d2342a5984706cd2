use crate::{
    element::Element,
    error::{Error, Result},
    MAX_DEPTH,
};

/// Bounds container nesting while an element stream is written or parsed.
///
/// Each open container is a frame holding how many elements it still expects
/// (a map expects two per pair, a tag exactly one). Every element that goes
/// by fills one slot of the innermost frame; frames that reach zero are
/// closed on the spot. Opening a frame past [`MAX_DEPTH`] fails.
#[derive(Clone, Debug, Default)]
pub struct DepthTracker {
    open: Vec<u64>,
}

impl DepthTracker {
    pub fn new() -> Self {
        Self { open: Vec::new() }
    }

    /// Account for one element: fill a slot in the innermost frame, and open
    /// a new frame if the element is itself a container.
    pub fn track(&mut self, elem: &Element) -> Result<()> {
        if let Some(expect) = self.open.last_mut() {
            *expect -= 1;
        }
        match elem {
            Element::Array(len) => self.open_frame(*len as u64)?,
            Element::Map(pairs) => self.open_frame(2 * (*pairs as u64))?,
            Element::Tag(_) => self.open_frame(1)?,
            _ => (),
        }
        self.close_finished();
        Ok(())
    }

    fn open_frame(&mut self, expect: u64) -> Result<()> {
        if self.open.len() >= MAX_DEPTH {
            return Err(Error::ParseLimit("Depth limit exceeded".to_string()));
        }
        self.open.push(expect);
        Ok(())
    }

    /// Close every innermost frame whose expected count has drained.
    pub fn close_finished(&mut self) {
        while self.open.last() == Some(&0) {
            self.open.pop();
        }
    }

    /// Settle the innermost frame before its count has drained. Serializers
    /// that stream a container of unknown length open its frame with an
    /// oversized count and call this once the last element is in.
    pub fn end_unsized(&mut self) {
        self.open.pop();
        self.close_finished();
    }

    /// True when no frame is open, i.e. the stream sits at a whole-item
    /// boundary.
    pub fn is_complete(&self) -> bool {
        self.open.is_empty()
    }
}
