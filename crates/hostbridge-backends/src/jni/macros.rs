//! `jni_exports!`: JNI shells named `Java_org_<module>_<name>`.

/// Declare JNI exports for one module.
///
/// Emits one `extern "system"` shell per declaration and a registrar that
/// adds them to an [`ExportsBuilder`](hostbridge_registry::ExportsBuilder).
///
/// ```ignore
/// hostbridge_backends::jni_exports! {
///     env: MyJniEnv,
///     module: InteropNativeModule,
///     registrar: register_interop,
///     exports: {
///         fn GetAnswer() -> KInt = answer;
///         ctx fn Reenter(kind: KInt) -> KInt = reenter;
///     }
/// }
/// ```
#[macro_export]
macro_rules! jni_exports {
    (
        env: $env:ty,
        module: $module:ident,
        registrar: $registrar:ident,
        exports: { $($items:tt)* } $(,)?
    ) => {
        $crate::__export_items!(__jni_shell item [$env, $module] $($items)*);

        pub fn $registrar(builder: &mut $crate::__private::ExportsBuilder) {
            $crate::__export_items!(__jni_shell (register builder) [$env, $module] $($items)*);
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __jni_shell {
    (item plain [$env:ty, $module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            #[allow(non_snake_case)]
            #[unsafe(no_mangle)]
            pub extern "system" fn [<Java_org_ $module _ $name>](
                env: <$env as $crate::jni::JniEnv>::Raw,
                _class: <$env as $crate::jni::JniEnv>::Ref,
                $($arg: <$ty as $crate::__private::FromHost<$crate::jni::Jni<$env>>>::Interop),*
            ) -> <$crate::__ret_ty!($($ret)?) as $crate::__private::ToHost<$crate::jni::Jni<$env>>>::Interop {
                // SAFETY: the JVM passes the environment of the calling thread.
                let env = unsafe { <$env as $crate::jni::JniEnv>::from_raw(env) };
                $crate::__private::tracing::trace!(export = stringify!($name), "jni call");
                $crate::__private::Invoke::<$crate::jni::Jni<$env>, ($($ty,)*), $crate::__ret_ty!($($ret)?)>::invoke(
                    &$imp,
                    env,
                    ($($arg,)*),
                )
            }
        }
    };

    (item context [$env:ty, $module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            #[allow(non_snake_case)]
            #[unsafe(no_mangle)]
            pub extern "system" fn [<Java_org_ $module _ $name>](
                env: <$env as $crate::jni::JniEnv>::Raw,
                _class: <$env as $crate::jni::JniEnv>::Ref,
                $($arg: <$ty as $crate::__private::FromHost<$crate::jni::Jni<$env>>>::Interop),*
            ) -> <$crate::__ret_ty!($($ret)?) as $crate::__private::ToHost<$crate::jni::Jni<$env>>>::Interop {
                // SAFETY: the JVM passes the environment of the calling thread.
                let env = unsafe { <$env as $crate::jni::JniEnv>::from_raw(env) };
                $crate::__private::tracing::trace!(export = stringify!($name), "jni call");
                $crate::__private::InvokeWithContext::<$crate::jni::Jni<$env>, ($($ty,)*), $crate::__ret_ty!($($ret)?)>::invoke_with_context(
                    &$imp,
                    env,
                    ($($arg,)*),
                )
            }
        }
    };

    (item direct [$env:ty, $module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            #[allow(non_snake_case)]
            #[unsafe(no_mangle)]
            pub extern "system" fn [<Java_org_ $module _ $name>](
                $($arg: <$ty as $crate::__private::DirectFromHost<$crate::jni::Jni<$env>>>::Interop),*
            ) -> <$crate::__ret_ty!($($ret)?) as $crate::__private::DirectToHost<$crate::jni::Jni<$env>>>::Interop {
                $crate::__private::InvokeDirect::<$crate::jni::Jni<$env>, ($($ty,)*), $crate::__ret_ty!($($ret)?)>::invoke_direct(
                    &$imp,
                    ($($arg,)*),
                )
            }
        }
    };

    ((register $builder:ident) $variant:ident [$env:ty, $module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            $crate::__register_export!($builder $variant $module $name [$($ty),*] [$($ret)?] [<Java_org_ $module _ $name>]);
        }
    };
}
