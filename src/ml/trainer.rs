// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop over sentence batches with Adam.
//
// Key Burn 0.20 insight:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on MyInnerBackend (Wgpu)
//   - Validation runs loss AND a full beam-search prediction
//     pass, so the reported accuracy is exactly what inference
//     would produce
//
// Batches are sentence slices straight from SentenceDataset —
// every batch re-derives its own character matrix dimensions, so
// there is no fixed-shape batcher in between.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::char_dict::CharDictionary;
use crate::data::dataset::SentenceDataset;
use crate::data::loader::GOLD_LEMMA_LABEL;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{LemmatizerModel, PredictOptions};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

const VALIDATION_LABEL: &str = "predicted";

pub fn run_training(
    cfg:          &TrainConfig,
    train_data:   SentenceDataset,
    val_data:     SentenceDataset,
    ckpt_manager: CheckpointManager,
    dict:         CharDictionary,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop(cfg, train_data, val_data, ckpt_manager, dict, device)
}

fn train_loop(
    cfg:            &TrainConfig,
    mut train_data: SentenceDataset,
    val_data:       SentenceDataset,
    ckpt_manager:   CheckpointManager,
    dict:           CharDictionary,
    device:         burn::backend::wgpu::WgpuDevice,
) -> Result<()> {

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config();
    let mut model: LemmatizerModel<MyBackend> = model_cfg.init(dict, &device)?;
    tracing::info!(
        "Model ready: {} GRU layers, hidden={}, vocabulary={}",
        cfg.rnn_layers, cfg.rnn_hidden_size, model.char_dict().len(),
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim_cfg = AdamConfig::new().with_epsilon(1e-8);
    let mut optim = optim_cfg.init();

    let metrics = MetricsLogger::new(cfg.checkpoint_dir.clone())?;
    let mut rng = StdRng::seed_from_u64(42);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        train_data.shuffle(&mut rng);

        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_data.batches(cfg.batch_size) {
            let loss = model.forward_loss(batch)?;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_loss_sum += loss_val;
            train_batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → LemmatizerModel<MyInnerBackend>
        let model_valid: LemmatizerModel<MyInnerBackend> = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;

        for batch in val_data.batches(cfg.batch_size) {
            let loss: f64 = model_valid.forward_loss(batch)?.into_scalar().elem::<f64>();
            val_loss_sum += loss;
            val_batches  += 1;
        }
        let avg_val_loss = if val_batches > 0 {
            val_loss_sum / val_batches as f64
        } else { f64::NAN };

        // exact-match lemma accuracy over a beam-decoded copy of
        // the validation sentences
        let lemma_acc = validation_accuracy(&model_valid, &val_data, cfg.batch_size)?;

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | lemma_acc={:.1}%",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss, lemma_acc * 100.0,
        );

        metrics.log(&EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, lemma_acc))?;
        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    tracing::info!("Training complete!");
    Ok(())
}

/// Beam-decode every validation word and compare against its
/// gold lemma label (or the word text where no label exists).
fn validation_accuracy(
    model:      &LemmatizerModel<MyInnerBackend>,
    val_data:   &SentenceDataset,
    batch_size: usize,
) -> Result<f64> {
    let mut sentences = val_data.sentences().to_vec();
    let opts = PredictOptions {
        label_name: VALIDATION_LABEL.to_string(),
        mini_batch_size: batch_size,
        beam_size: None,
        return_loss: false,
    };
    model.predict(&mut sentences, &opts)?;

    let mut correct = 0usize;
    let mut total   = 0usize;
    for sentence in &sentences {
        for word in sentence.words() {
            let gold = word.label(GOLD_LEMMA_LABEL).unwrap_or(word.text());
            if word.label(VALIDATION_LABEL) == Some(gold) {
                correct += 1;
            }
            total += 1;
        }
    }

    Ok(if total > 0 { correct as f64 / total as f64 } else { 0.0 })
}
