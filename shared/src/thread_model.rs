//! The per-node frame release policy.
//!
//! A Node releases a frame *locally* (signals its parent that the frame's
//! local work no longer blocks the application) at exactly one stage of the
//! frame, chosen by its [`ThreadModel`]. [`ThreadModel::local_release`] is the
//! whole transition table; node command handlers only consult it.

use crate::wire::{error::SerdeErr, reader::PacketReader, serde::Serde, writer::PacketWriter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThreadModel {
    /// Release at frame start without waiting on pipes. Renders of
    /// consecutive frames may interleave.
    Async,
    /// Release once every pipe has finished drawing the frame.
    DrawSync,
    /// Release once every pipe has finished all of its tasks for the frame.
    LocalSync,
}

impl ThreadModel {
    /// Model used when the configuration leaves it undefined
    pub const DEFAULT: ThreadModel = ThreadModel::DrawSync;

    pub const ALL: [ThreadModel; 3] = [
        ThreadModel::Async,
        ThreadModel::DrawSync,
        ThreadModel::LocalSync,
    ];

    /// What a node with this model does about local release at `stage`
    pub const fn local_release(self, stage: FrameStage) -> LocalRelease {
        match (self, stage) {
            (ThreadModel::Async, FrameStage::Start) => LocalRelease::Now,
            (ThreadModel::DrawSync, FrameStage::DrawFinish) => LocalRelease::AfterPipesDrawn,
            (ThreadModel::LocalSync, FrameStage::TasksFinish) => LocalRelease::AfterPipesFinished,
            _ => LocalRelease::Deferred,
        }
    }

    /// The one stage at which this model releases a frame locally
    pub fn release_stage(self) -> FrameStage {
        FrameStage::ALL
            .into_iter()
            .find(|stage| self.local_release(*stage) != LocalRelease::Deferred)
            .unwrap_or(FrameStage::Start)
    }

    fn to_u8(self) -> u8 {
        match self {
            ThreadModel::Async => 0,
            ThreadModel::DrawSync => 1,
            ThreadModel::LocalSync => 2,
        }
    }
}

/// Stages of a frame at which a node may release it locally
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameStage {
    Start,
    DrawFinish,
    TasksFinish,
}

impl FrameStage {
    pub const ALL: [FrameStage; 3] = [
        FrameStage::Start,
        FrameStage::DrawFinish,
        FrameStage::TasksFinish,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocalRelease {
    /// Not this stage; another stage releases
    Deferred,
    /// Release immediately
    Now,
    /// Wait for every pipe's local (draw) watermark, then release
    AfterPipesDrawn,
    /// Wait for every pipe's finished watermark, then release
    AfterPipesFinished,
}

impl Serde for ThreadModel {
    fn ser(&self, writer: &mut PacketWriter) {
        self.to_u8().ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        match u8::de(reader)? {
            0 => Ok(ThreadModel::Async),
            1 => Ok(ThreadModel::DrawSync),
            2 => Ok(ThreadModel::LocalSync),
            value => Err(SerdeErr::InvalidDiscriminant {
                type_name: "ThreadModel",
                value: u32::from(value),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        use FrameStage::*;
        use LocalRelease::*;

        let expected = [
            (ThreadModel::Async, [Now, Deferred, Deferred]),
            (ThreadModel::DrawSync, [Deferred, AfterPipesDrawn, Deferred]),
            (ThreadModel::LocalSync, [Deferred, Deferred, AfterPipesFinished]),
        ];

        for (model, row) in expected {
            for (stage, release) in [Start, DrawFinish, TasksFinish].into_iter().zip(row) {
                assert_eq!(
                    model.local_release(stage),
                    release,
                    "{:?} at {:?}",
                    model,
                    stage
                );
            }
        }
    }

    #[test]
    fn every_model_releases_exactly_once() {
        for model in ThreadModel::ALL {
            let releasing = FrameStage::ALL
                .into_iter()
                .filter(|stage| model.local_release(*stage) != LocalRelease::Deferred)
                .count();
            assert_eq!(releasing, 1, "{:?}", model);
        }
    }

    #[test]
    fn release_stage_matches_table() {
        assert_eq!(ThreadModel::Async.release_stage(), FrameStage::Start);
        assert_eq!(ThreadModel::DrawSync.release_stage(), FrameStage::DrawFinish);
        assert_eq!(ThreadModel::LocalSync.release_stage(), FrameStage::TasksFinish);
    }
}
