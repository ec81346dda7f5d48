use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use log::trace;
use parking_lot::{Condvar, Mutex};

use crate::{
    connection::{decoder::Decoder, encoder::Encoder},
    frame::{
        error::FrameDataError,
        image::{read_images, write_images, Image},
    },
    object::{
        dirty_bits::DirtyBits,
        master::Master,
        object_version::{ObjectId, ObjectVersion},
        replica::Replica,
        versioned::Versioned,
    },
    protocol::{packets::FrameDataTransmitPacket, Packet},
    transport::PacketSender,
    types::FrameNumber,
    wire::{error::SerdeErr, reader::PacketReader, serde::Serde, writer::PacketWriter},
};

/// The replicated description of an output frame
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameDataState {
    pub offset: [i32; 2],
    /// x, y, width, height
    pub pixel_viewport: [u32; 4],
    pub buffers: u32,
}

impl FrameDataState {
    pub const OFFSET: DirtyBits = DirtyBits::custom(0);
    pub const PIXEL_VIEWPORT: DirtyBits = DirtyBits::custom(1);
    pub const BUFFERS: DirtyBits = DirtyBits::custom(2);

    pub const BUFFER_COLOR: u32 = 1 << 0;
    pub const BUFFER_DEPTH: u32 = 1 << 1;
}

impl Versioned for FrameDataState {
    fn serialize(&self, writer: &mut PacketWriter, dirty: DirtyBits) {
        if dirty.contains(Self::OFFSET) {
            self.offset.ser(writer);
        }
        if dirty.contains(Self::PIXEL_VIEWPORT) {
            self.pixel_viewport.ser(writer);
        }
        if dirty.contains(Self::BUFFERS) {
            self.buffers.ser(writer);
        }
    }

    fn deserialize(&mut self, reader: &mut PacketReader, dirty: DirtyBits) -> Result<(), SerdeErr> {
        if dirty.contains(Self::OFFSET) {
            self.offset = <[i32; 2]>::de(reader)?;
        }
        if dirty.contains(Self::PIXEL_VIEWPORT) {
            self.pixel_viewport = <[u32; 4]>::de(reader)?;
        }
        if dirty.contains(Self::BUFFERS) {
            self.buffers = u32::de(reader)?;
        }
        Ok(())
    }
}

/// Instrumentation for one `FrameData::transmit`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransmitStats {
    /// Size of the serialized images before compression
    pub raw_bytes: usize,
    /// Size of the packet handed to the transport
    pub sent_bytes: usize,
    pub compress_time: Duration,
    pub total_time: Duration,
}

/// A node's view of an output frame: the replicated `FrameDataState`, the
/// images produced locally for it, and the images other nodes sent to it.
pub struct FrameData {
    state: Arc<Replica<FrameDataState>>,
    images: Mutex<Vec<Image>>,
    ready: Mutex<BTreeMap<FrameNumber, Vec<Image>>>,
    ready_changed: Condvar,
}

impl FrameData {
    pub fn new(state: Arc<Replica<FrameDataState>>) -> Self {
        Self {
            state,
            images: Mutex::new(Vec::new()),
            ready: Mutex::new(BTreeMap::new()),
            ready_changed: Condvar::new(),
        }
    }

    /// Frame data that is not attached to any session, holding the master's
    /// current state
    pub fn standalone(master: &Master<FrameDataState>) -> Result<Self, FrameDataError> {
        let replica = Replica::new(master.id(), FrameDataState::default());
        replica.push_instance(master.instance_data())?;
        replica.sync(master.version())?;
        Ok(Self::new(Arc::new(replica)))
    }

    pub fn id(&self) -> ObjectId {
        self.state.id()
    }

    pub fn object_version(&self) -> ObjectVersion {
        ObjectVersion::new(self.state.id(), self.state.version())
    }

    pub fn replica(&self) -> &Arc<Replica<FrameDataState>> {
        &self.state
    }

    pub fn state(&self) -> FrameDataState {
        self.state.read(|state| state.clone())
    }

    /// Syncs the replicated state to `version`
    pub fn sync(&self, version: u32) -> Result<u32, FrameDataError> {
        Ok(self.state.sync(version)?)
    }

    // Local images

    pub fn add_image(&self, image: Image) {
        self.images.lock().push(image);
    }

    pub fn image_count(&self) -> usize {
        self.images.lock().len()
    }

    pub fn clear_images(&self) {
        self.images.lock().clear();
    }

    /// Sends the local images for `frame_number` to the node at `target`
    pub fn transmit(
        &self,
        target: &SocketAddr,
        frame_number: FrameNumber,
        encoder: &mut Encoder,
        sender: &dyn PacketSender,
    ) -> Result<TransmitStats, FrameDataError> {
        let start = Instant::now();

        let mut writer = PacketWriter::new();
        write_images(&self.images.lock(), &mut writer);
        let raw = writer.to_bytes();

        let compress_start = Instant::now();
        let encoded = encoder.try_encode(&raw)?;
        let compress_time = compress_start.elapsed();

        let packet = FrameDataTransmitPacket {
            data: self.object_version(),
            frame_number,
            compressed: encoded.compressed,
            payload: encoded.bytes.to_vec(),
        };
        let bytes = packet.encode();
        sender.send(target, &bytes)?;

        let stats = TransmitStats {
            raw_bytes: raw.len(),
            sent_bytes: bytes.len(),
            compress_time,
            total_time: start.elapsed(),
        };
        trace!(
            "Transmitted {} frame {} to {}: {:?}",
            self.id(),
            frame_number,
            target,
            stats
        );
        Ok(stats)
    }

    // Received images

    /// Stores the images of a received transmission and wakes waiters
    pub fn receive_transmit(
        &self,
        packet: FrameDataTransmitPacket,
        decoder: &mut Decoder,
    ) -> Result<(), FrameDataError> {
        if packet.data.id != self.id() {
            return Err(FrameDataError::WrongObject {
                expected: self.id(),
                actual: packet.data.id,
            });
        }

        let payload = decoder.try_decode(&packet.payload, packet.compressed)?;
        let mut reader = PacketReader::new(payload);
        let images = read_images(&mut reader).map_err(|source| FrameDataError::Malformed {
            object_id: packet.data.id,
            frame_number: packet.frame_number,
            source,
        })?;

        trace!(
            "{} received {} images for frame {}",
            self.id(),
            images.len(),
            packet.frame_number
        );
        self.ready
            .lock()
            .entry(packet.frame_number)
            .or_default()
            .extend(images);
        self.ready_changed.notify_all();
        Ok(())
    }

    pub fn is_ready(&self, frame_number: FrameNumber) -> bool {
        self.ready.lock().contains_key(&frame_number)
    }

    /// Blocks until images for `frame_number` arrived and returns them
    pub fn wait_ready(
        &self,
        frame_number: FrameNumber,
        timeout: Duration,
    ) -> Result<Vec<Image>, FrameDataError> {
        let deadline = Instant::now() + timeout;
        let mut ready = self.ready.lock();
        loop {
            if let Some(images) = ready.get(&frame_number) {
                return Ok(images.clone());
            }
            if self.ready_changed.wait_until(&mut ready, deadline).timed_out()
                && !ready.contains_key(&frame_number)
            {
                return Err(FrameDataError::ReadyTimeout {
                    object_id: self.id(),
                    frame_number,
                    timeout,
                });
            }
        }
    }

    /// Drops received images of frames older than `frame_number`
    pub fn flush_ready(&self, frame_number: FrameNumber) {
        let mut ready = self.ready.lock();
        let keep = ready.split_off(&frame_number);
        *ready = keep;
    }
}
