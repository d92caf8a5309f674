//! # authorizer - remote attribute values for XML documents
//!
//! Resolves a declarative configuration of "auto-complete" rules into request and
//! upload descriptors, and submits new suggestions to the configured servers.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `authorizer` works internally.
//!
//! ### Configuration
//!
//! A configuration has optional global settings and a list of rules:
//!
//! ```xml
//! <config xmlns="http://humanistika.org/ns/tei-authorizer">
//!     <server>
//!         <baseUrl>http://srv/</baseUrl>
//!     </server>
//!     <autoComplete>
//!         <context>//tei:w</context>
//!         <attribute>ana</attribute>
//!         <selection>@ana</selection>
//!         <request>
//!             <url>$baseUrl/lookup</url>
//!         </request>
//!         <upload>
//!             <url>$baseUrl/upload?value=$suggestion</url>
//!         </upload>
//!     </autoComplete>
//! </config>
//! ```
//!
//! Files are read by [loader] (XML, YAML or JSON) into the [raw] structures, which
//! mirror the file and keep every setting optional.
//!
//! ### Resolution
//!
//! see [resolve::ConfigResolver::resolve]
//!
//! Every rule is turned into a [descriptor::RequestDescriptor] and, when it has an
//! upload section, a [descriptor::UploadDescriptor]. Settings of a rule win over
//! global ones:
//!
//! | **setting**        | **rule**              | **global**        | **neither**            |
//! |--------------------|-----------------------|-------------------|------------------------|
//! | authentication     | rule server           | global server     | none                   |
//! | namespace bindings | merged, rule wins     | merged            | empty                  |
//! | base url           | rule server           | global server     | empty string + warning |
//!
//! `$baseUrl`, `$username` and `$password` are substituted during resolution (see
//! [url_template]). The remaining variables of an upload url (`$suggestion`,
//! `$description`, ...) are only known once a user submits something.
//!
//! ### Submission
//!
//! see [submit::SubmissionClient::submit]
//!
//! A suggestion is sent as XML, JSON or form body, or only through the url. XML and
//! JSON bodies may be rewritten by a [transform::Transformer] first. The outcome is
//! always a [descriptor::SubmissionOutcome], errors do not escape.
//!
pub mod descriptor;
pub mod error;
pub mod loader;
pub mod raw;
pub mod resolve;
pub mod submit;
pub mod transform;
pub mod url_template;
