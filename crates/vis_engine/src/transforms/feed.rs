//! Transform feed plumbing
//!
//! The subscription layer hands complete transform messages to the core
//! through a non-blocking channel. A listener thread drains the channel into
//! the shared [`FrameTransformTree`], one lock acquisition per message.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::frame::StampedTransform;
use super::tree::FrameTransformTree;

/// Sending half of the transform feed; cheap to clone across producers
#[derive(Debug, Clone)]
pub struct TransformFeed {
    sender: Sender<Vec<StampedTransform>>,
}

impl TransformFeed {
    /// Enqueue one transform message. Never blocks.
    ///
    /// Returns `false` when the listener has already stopped.
    pub fn publish(&self, transforms: Vec<StampedTransform>) -> bool {
        self.sender.send(transforms).is_ok()
    }

    /// Enqueue a single transform
    pub fn publish_one(&self, transform: StampedTransform) -> bool {
        self.publish(vec![transform])
    }
}

/// Background thread applying feed messages to a tree
#[derive(Debug)]
pub struct TransformListener {
    handle: JoinHandle<usize>,
}

impl TransformListener {
    /// Create a feed and start a listener writing into `tree`.
    ///
    /// The listener exits once every [`TransformFeed`] clone is dropped.
    pub fn spawn(tree: Arc<FrameTransformTree>) -> std::io::Result<(TransformFeed, Self)> {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("transform-listener".to_string())
            .spawn(move || Self::run(&tree, &receiver))?;
        Ok((TransformFeed { sender }, Self { handle }))
    }

    fn run(tree: &FrameTransformTree, receiver: &Receiver<Vec<StampedTransform>>) -> usize {
        let mut messages = 0;
        for batch in receiver {
            let applied = tree.update_transforms(batch);
            log::trace!("Applied {} transforms from feed", applied);
            messages += 1;
        }
        log::debug!("Transform listener stopped after {} messages", messages);
        messages
    }

    /// Wait for the listener to drain and stop; returns the message count
    pub fn join(self) -> usize {
        self.handle.join().unwrap_or_else(|_| {
            log::error!("Transform listener thread panicked");
            0
        })
    }
}
