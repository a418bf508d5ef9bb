// End-to-end tests for the lesson audio prefetcher
//
// Each test gets its own temporary directory holding the artifact store and
// the failure log, so tests run in parallel without sharing state.
//
// - test_prefetch drives PrefetchService with a scripted in-memory TTS
//   repository that records calls and concurrent depth
// - test_http_tts points HttpTtsRepository at a local axum server that
//   plays the remote TTS endpoint
//
// Backoffs and pacing delays are set to milliseconds so nothing waits for
// real minutes.

mod test_http_tts;
