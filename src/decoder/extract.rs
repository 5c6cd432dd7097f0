use crate::common::Sample;
use crate::source::ByteSource;

use super::engine::FrameDecoder;
use super::stream::FrameStream;
use super::synth::SynthBlock;
use super::PartialDecode;

/// Moves decoded samples from the engine's output block into caller buffers.
///
/// The current [`SynthBlock`] survives between pulls, so a frame that did not fit into one
/// output buffer continues in the next.
#[derive(Debug, Default)]
pub(crate) struct SampleExtractor {
    block: SynthBlock,
}

impl SampleExtractor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn block(&self) -> &SynthBlock {
        &self.block
    }

    /// Drops the current block and its storage.
    pub(crate) fn clear(&mut self) {
        self.block.clear();
    }

    /// Fills `out` with up to `target` interleaved samples, decoding frames as needed.
    ///
    /// Only whole frame positions are written, so the result is a multiple of the channel
    /// count. Fewer than `target` samples are returned at end of stream. A fatal error
    /// reports how many samples were written before it; those are valid.
    pub(crate) fn pull<S, D>(
        &mut self,
        target: usize,
        out: &mut [Sample],
        stream: &mut FrameStream<S>,
        engine: &mut D,
    ) -> Result<usize, PartialDecode>
    where
        S: ByteSource,
        D: FrameDecoder,
    {
        let target = target.min(out.len());
        let mut written = 0;

        loop {
            written += self.block.extract(&mut out[written..target]);
            // a position left over means the output cannot take a whole one
            if written == target || self.block.remaining() > 0 {
                break;
            }
            match stream.next_block(engine, &mut self.block) {
                Ok(true) => {}
                Ok(false) => break,
                Err(cause) => return Err(PartialDecode { written, cause }),
            }
        }
        Ok(written)
    }
}
