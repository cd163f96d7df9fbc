use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    thread::JoinHandle,
};

use glow_entities::{EntityDescriptor, EntityState, StateValue};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use tokio::sync::mpsc;

use crate::pipeline::{EntitySink, PipelineError};

/// Writes entity registrations and state changes as JSON lines.
///
/// Records mirror the host platform's sensor model, so the output can be
/// piped into any adapter that speaks it:
///
/// ```text
/// {"event":"register","unique_id":"...","unit_of_measurement":"kWh","device_class":"energy",...}
/// {"event":"state","unique_id":"...","state":6613.405,"last_reset":null,"attributes":{"device_id":"..."}}
/// ```
///
/// `register` and `publish` only enqueue; a dedicated thread owns the
/// writer. Dropping the sink drains the queue and joins that thread.
pub struct NdjsonEntitySink {
    tx: Option<mpsc::UnboundedSender<Value>>,
    writer: Option<JoinHandle<()>>,
}

impl NdjsonEntitySink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = std::thread::Builder::new()
            .name("glow-ndjson-sink".to_string())
            .spawn(move || write_records(rx, out))
            .map_err(|e| tracing::error!(error = %e, "failed to start entity writer thread"))
            .ok();

        Self {
            tx: writer.is_some().then_some(tx),
            writer,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| PipelineError::Sink(format!("failed to create {}: {e}", path.display())))?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    fn enqueue(&self, record: Value) {
        let sent = self.tx.as_ref().is_some_and(|tx| tx.send(record).is_ok());
        if !sent {
            tracing::warn!("entity writer is gone, dropping record");
            metrics::counter!("glow_sink_write_errors_total").increment(1);
        }
    }
}

impl Drop for NdjsonEntitySink {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                tracing::error!("entity writer thread panicked");
            }
        }
    }
}

fn write_records(mut rx: mpsc::UnboundedReceiver<Value>, mut out: Box<dyn Write + Send>) {
    while let Some(record) = rx.blocking_recv() {
        let res = serde_json::to_writer(&mut out, &record)
            .map_err(io::Error::from)
            .and_then(|()| out.write_all(b"\n"))
            .and_then(|()| out.flush());

        if let Err(e) = res {
            tracing::warn!(error = %e, "failed to write entity record");
            metrics::counter!("glow_sink_write_errors_total").increment(1);
        }
    }
}

pub(crate) fn descriptor_record(d: &EntityDescriptor) -> Value {
    json!({
        "event": "register",
        "unique_id": d.unique_id,
        "name": d.name,
        "device_id": d.device_id,
        "unit_of_measurement": d.unit.unit(),
        "device_class": d.unit.device_class(),
        "state_class": d.state_policy.map(|p| p.state_class()),
        "entity_category": d.category.map(|c| c.as_str()),
        "icon": d.icon,
        "has_last_reset": d.has_last_reset,
        "force_update": d.force_update,
        "visible_by_default": d.visible_by_default,
        "device": {
            "name": d.device.name,
            "manufacturer": d.device.manufacturer,
            "model": d.device.model,
            "connections": d.device.connections,
        },
    })
}

pub(crate) fn state_record(s: &EntityState) -> Value {
    let state = match &s.value {
        Some(StateValue::Number(n)) => json!(n),
        Some(StateValue::Text(t)) => json!(t),
        None => Value::Null,
    };
    let last_reset = s.last_reset.and_then(|t| t.format(&Rfc3339).ok());

    json!({
        "event": "state",
        "unique_id": s.unique_id,
        "state": state,
        "last_reset": last_reset,
        "attributes": { "device_id": s.device_id },
    })
}

impl EntitySink for NdjsonEntitySink {
    fn register(&self, entities: &[EntityDescriptor]) {
        for d in entities {
            self.enqueue(descriptor_record(d));
        }
    }

    fn publish(&self, state: &EntityState) {
        self.enqueue(state_record(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{catalog::ELECTRICITY_MEASUREMENTS, EntityOptions};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use time::macros::datetime;

    #[test]
    fn descriptor_record_uses_host_vocabulary() {
        let d = ELECTRICITY_MEASUREMENTS[1].descriptor("1234567890AB", EntityOptions::default());
        let rec = descriptor_record(&d);

        assert_eq!(rec["event"], "register");
        assert_eq!(rec["unique_id"], "1234567890ab_smart_meter_electricity_import");
        assert_eq!(rec["unit_of_measurement"], "kWh");
        assert_eq!(rec["device_class"], "energy");
        assert_eq!(rec["state_class"], "total_increasing");
        assert_eq!(rec["entity_category"], Value::Null);
        assert_eq!(rec["device"]["connections"][0][0], "mac");
    }

    #[test]
    fn state_record_formats_unknown_and_last_reset() {
        let rec = state_record(&EntityState {
            unique_id: "x".to_string(),
            device_id: "ABC".to_string(),
            value: None,
            last_reset: Some(datetime!(2022-06-11 23:00:00 UTC)),
        });

        assert_eq!(rec["state"], Value::Null);
        assert_eq!(rec["last_reset"], "2022-06-11T23:00:00Z");
        assert_eq!(rec["attributes"]["device_id"], "ABC");
    }

    #[test]
    fn file_sink_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entities.ndjson");
        let sink = NdjsonEntitySink::create(&path).unwrap();

        let d = ELECTRICITY_MEASUREMENTS[0].descriptor("ABC", EntityOptions::default());
        sink.register(std::slice::from_ref(&d));
        sink.publish(&EntityState {
            unique_id: d.unique_id.clone(),
            device_id: "ABC".to_string(),
            value: Some(StateValue::Number(0.0)),
            last_reset: None,
        });
        drop(sink);

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["event"], "state");
        assert_eq!(lines[1]["state"], 0.0);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn publish_under_a_held_lock_only_enqueues() {
        let buf = SharedBuf::default();
        let sink = NdjsonEntitySink::new(Box::new(buf.clone()));

        // Hold the writer's buffer so any synchronous write would block here.
        let held = buf.0.lock();
        for n in 0..3 {
            sink.publish(&EntityState {
                unique_id: format!("e{n}"),
                device_id: "ABC".to_string(),
                value: Some(StateValue::Number(f64::from(n))),
                last_reset: None,
            });
        }
        drop(held);
        drop(sink);

        let written = String::from_utf8(buf.0.lock().clone()).unwrap();
        let ids: Vec<String> = written
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["unique_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["e0", "e1", "e2"]);
    }
}
