// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Storage module
//
// Two sinks receive every accepted reading:
// - LocalSink: durable CSV on local disk, flushed per row
// - RemoteSink: best-effort mirror, bounded by a timeout and never retried

pub mod backend;
pub mod factory;
pub mod filesystem;
pub mod http;

pub use backend::RemoteSink;
pub use factory::RemoteSinkFactory;
pub use filesystem::LocalSink;
pub use http::HttpRemoteSink;
