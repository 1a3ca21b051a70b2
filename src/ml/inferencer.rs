// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::Result;

use crate::data::char_dict::CharDictionary;
use crate::domain::sentence::Sentence;
use crate::domain::traits::LemmaAnnotator;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{LemmatizerModel, PredictOptions};

type InferBackend = burn::backend::Wgpu;

const INFER_BATCH_SIZE: usize = 32;

/// A trained model restored from disk, ready to annotate.
pub struct Inferencer {
    model: LemmatizerModel<InferBackend>,
}

impl Inferencer {
    /// Rebuild the architecture from the persisted training
    /// config and load the latest checkpoint weights into it.
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        dict:         CharDictionary,
    ) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        let cfg    = ckpt_manager.load_config()?;
        let model: LemmatizerModel<InferBackend> = cfg.model_config().init(dict, &device)?;
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self { model })
    }

    pub fn model(&self) -> &LemmatizerModel<InferBackend> {
        &self.model
    }

    /// Annotate in place, optionally returning the summed
    /// diagnostic loss and token count.
    pub fn predict(
        &self,
        sentences: &mut [Sentence],
        opts:      &PredictOptions,
    ) -> Result<Option<(f64, usize)>> {
        self.model.predict(sentences, opts)
    }
}

impl LemmaAnnotator for Inferencer {
    fn annotate(&self, sentences: &mut [Sentence], label_name: &str) -> Result<()> {
        let opts = PredictOptions {
            label_name: label_name.to_string(),
            mini_batch_size: INFER_BATCH_SIZE,
            beam_size: None,
            return_loss: false,
        };
        self.model.predict(sentences, &opts)?;
        Ok(())
    }
}
