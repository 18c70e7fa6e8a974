use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use eva_flow::{ContextData, Flows, FlowError, Pipeline, PipelineControl};
use tokio::runtime::Runtime;

#[derive(Clone, Debug, Default)]
struct BenchContext {
  counter: u64,
}

fn build_pipeline(num_steps: usize) -> Pipeline<BenchContext, FlowError> {
  let names: Vec<String> = (0..num_steps).map(|i| format!("step_{i}")).collect();
  let defs: Vec<(&str, bool, Option<eva_flow::SkipCondition<BenchContext>>)> =
    names.iter().map(|n| (n.as_str(), false, None)).collect();
  let mut p = Pipeline::<BenchContext, FlowError>::new(&defs);
  for name in &names {
    p.on_root(name, |ctx: ContextData<BenchContext>| {
      Box::pin(async move {
        ctx.write().counter += 1;
        Ok::<_, FlowError>(PipelineControl::Continue)
      })
    });
  }
  p
}

fn bench_pipeline_run(c: &mut Criterion) {
  let rt = Runtime::new().expect("tokio runtime");
  let mut group = c.benchmark_group("pipeline_run");
  for num_steps in [1usize, 6, 24] {
    let flows = Flows::<FlowError>::new();
    flows.register_pipeline(build_pipeline(num_steps));
    group.bench_with_input(BenchmarkId::from_parameter(num_steps), &num_steps, |b, _| {
      b.to_async(&rt).iter(|| async {
        let ctx = ContextData::new(BenchContext::default());
        flows.run(ctx).await.expect("pipeline run")
      })
    });
  }
  group.finish();
}

criterion_group!(benches, bench_pipeline_run);
criterion_main!(benches);
